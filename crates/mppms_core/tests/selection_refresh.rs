mod common;

use common::{assets, project_with, user};
use mppms_core::controller::index::{PanelOrigin, Tab};
use mppms_core::controller::selection::{
    refresh_preserving_selection, CollectionView, SelectionOutcome, TableModel,
};
use mppms_core::{
    AppSession, Asset, ChangeBus, ChangeEvent, EntityId, MemoryStore, Repository, UserRole,
};
use std::rc::Rc;

#[test]
fn selection_survives_field_changes_and_clears_on_delete() {
    let store = MemoryStore::in_memory();
    assets(&store, "valve", 5);
    let mut table = TableModel::new();
    refresh_preserving_selection(&mut table, &Repository::<Asset>::load_all(&store).unwrap());
    assert!(table.select_id(EntityId(5)));

    let mut renamed: Asset = store.load_by_id(EntityId(5)).unwrap();
    renamed.name = "valve (replaced)".to_string();
    store.save(&renamed).unwrap();
    let outcome =
        refresh_preserving_selection(&mut table, &Repository::<Asset>::load_all(&store).unwrap());

    assert_eq!(outcome, SelectionOutcome::Kept(EntityId(5)));
    assert_eq!(table.selected_id(), Some(EntityId(5)));
    assert_eq!(table.row(EntityId(5)).unwrap().name, "valve (replaced)");

    Repository::<Asset>::delete(&store, EntityId(5)).unwrap();
    let outcome =
        refresh_preserving_selection(&mut table, &Repository::<Asset>::load_all(&store).unwrap());

    assert_eq!(outcome, SelectionOutcome::Lost(EntityId(5)));
    assert!(outcome.is_lost());
    assert_eq!(table.selected_id(), None);
    assert_eq!(table.len(), 4);
}

/// List view that records every render and selection call.
#[derive(Default)]
struct RecordingList {
    items: Vec<Asset>,
    selected: Option<Asset>,
    renders: usize,
    selections: Vec<Option<EntityId>>,
}

impl CollectionView<Asset> for RecordingList {
    fn render_collection(&mut self, items: &[Asset]) {
        self.items = items.to_vec();
        self.renders += 1;
    }

    fn selected(&self) -> Option<&Asset> {
        self.selected.as_ref()
    }

    fn set_selected(&mut self, entity: Option<&Asset>) {
        self.selections.push(entity.map(|asset| asset.id));
        self.selected = entity.cloned();
    }
}

#[test]
fn view_receives_fresh_instance_as_selection() {
    let store = MemoryStore::in_memory();
    let pool = assets(&store, "tank", 3);
    let mut view = RecordingList {
        selected: Some(pool[1].clone()),
        ..RecordingList::default()
    };
    let mut relocated = pool[1].clone();
    relocated.location = "yard".to_string();
    store.save(&relocated).unwrap();

    let outcome =
        refresh_preserving_selection(&mut view, &Repository::<Asset>::load_all(&store).unwrap());

    assert_eq!(outcome, SelectionOutcome::Kept(pool[1].id));
    assert_eq!(view.renders, 1);
    assert_eq!(view.items.len(), 3);
    assert_eq!(view.selections, vec![Some(pool[1].id)]);
    assert_eq!(view.selected.as_ref().unwrap().location, "yard");
}

#[test]
fn unselected_table_stays_unselected() {
    let store = MemoryStore::in_memory();
    assets(&store, "meter", 2);
    let mut table: TableModel<Asset> = TableModel::new();

    let outcome =
        refresh_preserving_selection(&mut table, &Repository::<Asset>::load_all(&store).unwrap());

    assert_eq!(outcome, SelectionOutcome::Unselected);
    assert_eq!(table.selected_id(), None);
}

#[test]
fn index_keeps_selection_and_panel_across_unrelated_saves() {
    let store = Rc::new(MemoryStore::in_memory());
    let pm = user(&*store, "pm", UserRole::ProjectManager);
    let pool = assets(&*store, "pump", 5);
    let session = AppSession::sign_in(Rc::clone(&store), ChangeBus::new(), pm.id).unwrap();
    let index = session.launch_index().unwrap();

    index.set_tab(Tab::Assets).unwrap();
    assert!(index.select(Tab::Assets, Some(pool[4].id)).unwrap());
    let panel = index.panel().unwrap();
    assert_eq!(panel.entity_id(), pool[4].id);

    let project = project_with(&*store, "late", Some(&pm), &[], &[]);
    session.bus().publish(ChangeEvent::saved(&project, true));

    assert_eq!(index.project_rows().len(), 1);
    assert_eq!(index.selected_id(Tab::Assets), Some(pool[4].id));
    assert_eq!(index.panel_origin(), Some(PanelOrigin::Selection));
    assert_eq!(index.panel().unwrap().entity_id(), pool[4].id);
}

#[test]
fn index_clears_panel_when_selected_row_is_deleted() {
    let store = Rc::new(MemoryStore::in_memory());
    let pm = user(&*store, "pm", UserRole::ProjectManager);
    let pool = assets(&*store, "pump", 5);
    let session = AppSession::sign_in(Rc::clone(&store), ChangeBus::new(), pm.id).unwrap();
    let index = session.launch_index().unwrap();
    index.navigate(Tab::Assets, pool[4].id).unwrap();
    assert!(index.panel().is_some());
    assert_eq!(session.bus().len(), 2);

    Repository::<Asset>::delete(&*store, pool[4].id).unwrap();
    session
        .bus()
        .publish(ChangeEvent::deleted::<Asset>(pool[4].id));

    assert_eq!(index.selected_id(Tab::Assets), None);
    assert!(index.panel().is_none());
    assert_eq!(index.asset_rows().len(), 4);
    assert_eq!(session.bus().len(), 1);
}
