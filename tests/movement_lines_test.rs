mod common;

use assert_matches::assert_matches;
use common::{actor, line, transfer_request, TestApp};
use movement_core::errors::ServiceError;
use movement_core::models::movement_line::LineStatus;
use movement_core::models::requests::LinePatch;
use rust_decimal_macros::dec;
use uuid::Uuid;

#[tokio::test]
async fn actual_quantity_drives_variance() {
    let app = TestApp::new();
    let user = actor();
    let movement = app
        .core
        .movements
        .create(
            transfer_request(Uuid::new_v4(), vec![line(1, dec!(10)), line(2, dec!(5))]),
            user,
        )
        .await
        .unwrap();
    let second_line = movement.lines[1].id;

    let updated = app
        .core
        .lines
        .update_actual_quantity(second_line, dec!(3.0), user)
        .await
        .unwrap();

    assert_eq!(updated.actual_quantity, Some(dec!(3.0)));
    assert_eq!(updated.variance(), Some(dec!(-2.0)));
    assert!(updated.has_variance());
    assert!(updated.is_short_picked());
}

#[tokio::test]
async fn exact_pick_has_no_variance() {
    let app = TestApp::new();
    let user = actor();
    let movement = app
        .core
        .movements
        .create(transfer_request(Uuid::new_v4(), vec![line(1, dec!(10))]), user)
        .await
        .unwrap();
    let line_id = movement.lines[0].id;

    let updated = app
        .core
        .lines
        .update_actual_quantity(line_id, dec!(10), user)
        .await
        .unwrap();
    assert_eq!(updated.variance(), Some(dec!(0)));
    assert!(!updated.has_variance());
    assert!(!updated.is_short_picked());
}

#[tokio::test]
async fn negative_actual_quantity_is_rejected() {
    let app = TestApp::new();
    let user = actor();
    let movement = app
        .core
        .movements
        .create(transfer_request(Uuid::new_v4(), vec![line(1, dec!(10))]), user)
        .await
        .unwrap();

    let err = app
        .core
        .lines
        .update_actual_quantity(movement.lines[0].id, dec!(-1), user)
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::ValidationFailed(_));
}

#[tokio::test]
async fn variance_and_short_pick_listings() {
    let app = TestApp::new();
    let user = actor();
    let movement = app
        .core
        .movements
        .create(
            transfer_request(
                Uuid::new_v4(),
                vec![line(1, dec!(10)), line(2, dec!(5)), line(3, dec!(4))],
            ),
            user,
        )
        .await
        .unwrap();

    // line 1: over-pick, line 2: short, line 3: exact.
    app.core
        .lines
        .update_actual_quantity(movement.lines[0].id, dec!(12), user)
        .await
        .unwrap();
    app.core
        .lines
        .update_actual_quantity(movement.lines[1].id, dec!(3), user)
        .await
        .unwrap();
    app.core
        .lines
        .update_actual_quantity(movement.lines[2].id, dec!(4), user)
        .await
        .unwrap();

    let with_variance = app.core.lines.list_with_variance().await.unwrap();
    assert_eq!(with_variance.len(), 2);

    let short = app.core.lines.list_short_picked().await.unwrap();
    assert_eq!(short.len(), 1);
    assert_eq!(short[0].id, movement.lines[1].id);
}

#[tokio::test]
async fn add_line_rejects_duplicate_line_number() {
    let app = TestApp::new();
    let user = actor();
    let movement = app
        .core
        .movements
        .create(transfer_request(Uuid::new_v4(), vec![line(1, dec!(10))]), user)
        .await
        .unwrap();

    let added = app
        .core
        .lines
        .add_to_movement(movement.id, line(2, dec!(7)), user)
        .await
        .unwrap();
    assert_eq!(added.line_number, 2);
    assert_eq!(added.status, LineStatus::Pending);

    let err = app
        .core
        .lines
        .add_to_movement(movement.id, line(2, dec!(1)), user)
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::ValidationFailed(messages) => {
        assert!(messages[0].contains("line_number 2"));
    });
}

#[tokio::test]
async fn requested_quantity_only_patchable_while_pending() {
    let app = TestApp::new();
    let user = actor();
    let movement = app
        .core
        .movements
        .create(transfer_request(Uuid::new_v4(), vec![line(1, dec!(10))]), user)
        .await
        .unwrap();
    let line_id = movement.lines[0].id;

    let patch = LinePatch {
        requested_quantity: Some(dec!(8)),
        ..Default::default()
    };
    let updated = app.core.lines.update(line_id, patch, user).await.unwrap();
    assert_eq!(updated.requested_quantity, dec!(8));

    app.core.lines.complete(line_id, user).await.unwrap();
    let patch = LinePatch {
        requested_quantity: Some(dec!(6)),
        ..Default::default()
    };
    let err = app.core.lines.update(line_id, patch, user).await.unwrap_err();
    assert_matches!(err, ServiceError::ValidationFailed(_));

    // Non-quantity fields stay patchable after completion.
    let patch = LinePatch {
        notes: Some("damaged carton".to_string()),
        ..Default::default()
    };
    let updated = app.core.lines.update(line_id, patch, user).await.unwrap();
    assert_eq!(updated.notes.as_deref(), Some("damaged carton"));
}

#[tokio::test]
async fn zero_requested_quantity_patch_is_rejected() {
    let app = TestApp::new();
    let user = actor();
    let movement = app
        .core
        .movements
        .create(transfer_request(Uuid::new_v4(), vec![line(1, dec!(10))]), user)
        .await
        .unwrap();

    let patch = LinePatch {
        requested_quantity: Some(dec!(0)),
        ..Default::default()
    };
    let err = app
        .core
        .lines
        .update(movement.lines[0].id, patch, user)
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::ValidationFailed(_));
}

#[tokio::test]
async fn completed_line_cannot_be_deleted() {
    let app = TestApp::new();
    let user = actor();
    let movement = app
        .core
        .movements
        .create(
            transfer_request(Uuid::new_v4(), vec![line(1, dec!(10)), line(2, dec!(5))]),
            user,
        )
        .await
        .unwrap();
    let first = movement.lines[0].id;
    let second = movement.lines[1].id;

    app.core.lines.complete(first, user).await.unwrap();
    let err = app.core.lines.delete(first, user).await.unwrap_err();
    assert_matches!(err, ServiceError::ValidationFailed(_));

    app.core.lines.delete(second, user).await.unwrap();
    let remaining = app.core.lines.list_by_movement(movement.id).await.unwrap();
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].id, first);
}

#[tokio::test]
async fn completing_a_completed_line_is_a_no_op() {
    let app = TestApp::new();
    let user = actor();
    let movement = app
        .core
        .movements
        .create(transfer_request(Uuid::new_v4(), vec![line(1, dec!(10))]), user)
        .await
        .unwrap();
    let line_id = movement.lines[0].id;

    let first = app.core.lines.complete(line_id, user).await.unwrap();
    assert_eq!(first.status, LineStatus::Completed);
    let version_after = app.core.movements.get_by_id(movement.id).await.unwrap().version;

    let second = app.core.lines.complete(line_id, user).await.unwrap();
    assert_eq!(second.status, LineStatus::Completed);
    assert_eq!(second.updated_at, first.updated_at);
    // No write happened, so the version token did not advance.
    let version_again = app.core.movements.get_by_id(movement.id).await.unwrap().version;
    assert_eq!(version_again, version_after);
}

#[tokio::test]
async fn lines_are_queryable_by_item_and_status() {
    let app = TestApp::new();
    let user = actor();
    let mut first = line(1, dec!(10));
    let item = Uuid::new_v4();
    first.item_id = item;
    let movement = app
        .core
        .movements
        .create(transfer_request(Uuid::new_v4(), vec![first, line(2, dec!(5))]), user)
        .await
        .unwrap();

    let by_item = app.core.lines.list_by_item(item).await.unwrap();
    assert_eq!(by_item.len(), 1);
    assert_eq!(by_item[0].item_id, item);

    app.core.lines.complete(movement.lines[0].id, user).await.unwrap();
    let completed = app.core.lines.list_by_status(LineStatus::Completed).await.unwrap();
    assert_eq!(completed.len(), 1);
    let pending = app.core.lines.list_by_status(LineStatus::Pending).await.unwrap();
    assert_eq!(pending.len(), 1);
}

#[tokio::test]
async fn unknown_line_is_not_found() {
    let app = TestApp::new();
    let err = app.core.lines.get_by_id(Uuid::new_v4()).await.unwrap_err();
    assert_matches!(err, ServiceError::NotFound(_));
}
