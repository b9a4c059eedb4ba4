// Inspector state machine transitions and the panel it describes.
mod common;

use common::{at, event};
use edcal::inspector::{
    ExemptionSet, Inspector, InspectorCommand, InspectorInput, InspectorMode, InspectorState,
    InteractionTarget, Key, PanelAction, PanelBody, SelectionState,
};
use edcal::model::{Rect, Status};

fn rect() -> Rect {
    Rect::new(100.0, 40.0, 180.0, 24.0)
}

fn click(inspector: &mut Inspector, id: u64, status: Status) {
    inspector.handle(InspectorInput::EventClicked {
        event: event(id, 8, 14, status),
        rect: rect(),
    });
}

fn outside() -> InteractionTarget {
    InteractionTarget::with_classes(["fc-daygrid-day-frame"])
}

#[test]
fn click_then_outside_closes() {
    let mut inspector = Inspector::default();
    click(&mut inspector, 1, Status::Publish);
    assert!(matches!(inspector.state(), InspectorState::Viewing { event, .. } if event.source_item_id == 1));

    inspector.handle(InspectorInput::PointerUp(outside()));
    assert_eq!(inspector.state(), &InspectorState::Closed);
    assert_eq!(inspector.selection(), SelectionState::default());
}

#[test]
fn clicking_another_event_switches_directly() {
    let mut inspector = Inspector::default();
    click(&mut inspector, 1, Status::Publish);
    click(&mut inspector, 2, Status::Draft);

    match inspector.state() {
        InspectorState::Viewing { event, anchor } => {
            assert_eq!(event.source_item_id, 2);
            assert_eq!(anchor, &rect());
        }
        other => panic!("expected Viewing(E2), got {:?}", other),
    }
}

#[test]
fn event_cell_parts_and_the_inspector_are_not_outside() {
    let mut inspector = Inspector::default();
    click(&mut inspector, 1, Status::Publish);

    for class in ["fc-title", "fc-time", "fc-status", "fc-event-title", "fc-event-headers"] {
        inspector.handle(InspectorInput::PointerUp(InteractionTarget::with_classes([class])));
        assert!(inspector.is_open(), "click on .{} closed the inspector", class);
    }
    inspector.handle(InspectorInput::PointerUp(InteractionTarget::inspector()));
    assert!(inspector.is_open());
}

#[test]
fn exemption_set_is_configurable() {
    let mut inspector = Inspector::new(ExemptionSet::new(["my-cell"]));
    click(&mut inspector, 1, Status::Publish);

    inspector.handle(InspectorInput::PointerUp(InteractionTarget::with_classes(["my-cell"])));
    assert!(inspector.is_open());
    inspector.handle(InspectorInput::PointerUp(InteractionTarget::with_classes(["fc-title"])));
    assert!(!inspector.is_open());
}

#[test]
fn escape_while_rescheduling_closes_without_passing_through_viewing() {
    let mut inspector = Inspector::default();
    click(&mut inspector, 1, Status::Publish);
    inspector.handle(InspectorInput::Reschedule);
    assert_eq!(inspector.selection().inspector_mode, InspectorMode::Reschedule);

    let command = inspector.handle(InspectorInput::KeyUp {
        key: Key::Escape,
        target: InteractionTarget::inspector(),
    });
    assert!(command.is_none());
    assert_eq!(inspector.state(), &InspectorState::Closed);
}

#[test]
fn other_keys_inside_the_inspector_keep_it_open() {
    let mut inspector = Inspector::default();
    click(&mut inspector, 1, Status::Publish);
    inspector.handle(InspectorInput::KeyUp {
        key: Key::Other("Tab".to_string()),
        target: InteractionTarget::inspector(),
    });
    assert!(inspector.is_open());

    inspector.handle(InspectorInput::KeyUp {
        key: Key::Other("Tab".to_string()),
        target: outside(),
    });
    assert!(!inspector.is_open());
}

#[test]
fn reschedule_seeds_picker_and_back_discards_it() {
    let mut inspector = Inspector::default();
    click(&mut inspector, 1, Status::Publish);
    inspector.handle(InspectorInput::Reschedule);
    match inspector.state() {
        InspectorState::Rescheduling { pending_date, .. } => assert_eq!(*pending_date, at(8, 14)),
        other => panic!("expected Rescheduling, got {:?}", other),
    }

    inspector.handle(InspectorInput::PickDate(at(12, 10)));
    inspector.handle(InspectorInput::Back);
    assert!(matches!(inspector.state(), InspectorState::Viewing { .. }));

    inspector.handle(InspectorInput::Reschedule);
    match inspector.state() {
        InspectorState::Rescheduling { pending_date, .. } => assert_eq!(*pending_date, at(8, 14)),
        other => panic!("expected Rescheduling, got {:?}", other),
    }
}

#[test]
fn confirm_commits_the_picked_date_and_closes() {
    let mut inspector = Inspector::default();
    click(&mut inspector, 5, Status::Future);
    inspector.handle(InspectorInput::Reschedule);
    inspector.handle(InspectorInput::PickDate(at(12, 10)));

    let command = inspector.handle(InspectorInput::ConfirmReschedule);
    match command {
        Some(InspectorCommand::Reschedule { event, date }) => {
            assert_eq!(event.source_item_id, 5);
            assert_eq!(date, at(12, 10));
        }
        other => panic!("expected a reschedule command, got {:?}", other),
    }
    assert_eq!(inspector.state(), &InspectorState::Closed);
}

#[test]
fn switch_to_draft_is_only_offered_for_non_drafts() {
    let mut inspector = Inspector::default();
    click(&mut inspector, 3, Status::Draft);
    assert!(inspector.handle(InspectorInput::SwitchToDraft).is_none());
    assert!(inspector.is_open());

    click(&mut inspector, 4, Status::Publish);
    let command = inspector.handle(InspectorInput::SwitchToDraft);
    assert!(matches!(
        command,
        Some(InspectorCommand::ChangeStatus { status: Status::Draft, .. })
    ));
    assert!(!inspector.is_open());
}

#[test]
fn panel_describes_the_selected_event() {
    let mut inspector = Inspector::default();
    assert!(inspector.panel().is_none());

    click(&mut inspector, 4, Status::Publish);
    let panel = inspector.panel().unwrap();
    assert_eq!(panel.title, "Post 4");
    assert_eq!(panel.date_label, "May 08, 2024 @ 2:00PM");
    assert_eq!(panel.origin, (100.0, 64.0));
    match panel.body {
        PanelBody::Details { actions } => {
            let labels: Vec<&str> = actions.iter().map(PanelAction::label).collect();
            assert_eq!(labels, vec!["Reschedule", "Switch to draft", "Edit", "Preview"]);
            assert!(actions.contains(&PanelAction::Edit(
                "https://example.com/wp-admin/post.php?post=4&action=edit".to_string()
            )));
        }
        other => panic!("expected details, got {:?}", other),
    }

    click(&mut inspector, 3, Status::Draft);
    match inspector.panel().unwrap().body {
        PanelBody::Details { actions } => assert!(!actions.contains(&PanelAction::SwitchToDraft)),
        other => panic!("expected details, got {:?}", other),
    }
}

#[test]
fn close_action_closes_from_any_open_state() {
    let mut inspector = Inspector::default();
    click(&mut inspector, 1, Status::Publish);
    inspector.handle(InspectorInput::Reschedule);
    inspector.handle(InspectorInput::Close);
    assert_eq!(inspector.state(), &InspectorState::Closed);

    // A fresh selection can begin right away.
    click(&mut inspector, 2, Status::Publish);
    assert!(inspector.is_open());
}
