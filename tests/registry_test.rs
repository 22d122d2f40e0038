mod common;

use common::{create_test_service, names};
use segment_service::SegmentError;

#[tokio::test]
async fn test_create_and_delete_segment_errors() {
    let (service, _guard) = create_test_service().await;

    service.create_segment("A", 0).await.unwrap();
    assert!(matches!(
        service.create_segment("A", 0).await,
        Err(SegmentError::NameTaken)
    ));
    assert!(matches!(
        service.create_segment("B", 150).await,
        Err(SegmentError::BadPercent)
    ));

    service.delete_segment("A").await.unwrap();
    assert!(matches!(
        service.delete_segment("A").await,
        Err(SegmentError::AlreadyDeleted)
    ));
    assert!(matches!(
        service.delete_segment("C").await,
        Err(SegmentError::NameFree)
    ));
}

#[tokio::test]
async fn test_deleted_name_is_never_reused() {
    let (service, _guard) = create_test_service().await;

    service.create_segment("promo", 0).await.unwrap();
    service.delete_segment("promo").await.unwrap();

    assert!(matches!(
        service.create_segment("promo", 0).await,
        Err(SegmentError::NameTaken)
    ));
}

#[tokio::test]
async fn test_bad_percent_is_checked_and_nothing_is_created() {
    let (service, _guard) = create_test_service().await;

    assert!(matches!(
        service.create_segment("neg", -1).await,
        Err(SegmentError::BadPercent)
    ));
    assert!(matches!(
        service.create_segment("big", 101).await,
        Err(SegmentError::BadPercent)
    ));

    // Neither name was consumed
    service.create_segment("neg", 0).await.unwrap();
    service.create_segment("big", 100).await.unwrap();
}

#[tokio::test]
async fn test_empty_name_is_rejected() {
    let (service, _guard) = create_test_service().await;

    assert!(matches!(
        service.create_segment("", 10).await,
        Err(SegmentError::NameEmpty)
    ));
}

#[tokio::test]
async fn test_delete_drops_memberships() {
    let (service, _guard) = create_test_service().await;

    service.create_segment("A", 0).await.unwrap();
    service.create_segment("B", 0).await.unwrap();
    service
        .update_user(1, &names(&["A", "B"]), &[], 0)
        .await
        .unwrap();
    assert_eq!(service.get_segments(1).await.unwrap(), names(&["A", "B"]));

    service.delete_segment("A").await.unwrap();
    assert_eq!(service.get_segments(1).await.unwrap(), names(&["B"]));

    let rows: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM memberships WHERE user_id = 1")
        .fetch_one(service.pool())
        .await
        .unwrap();
    assert_eq!(rows, 1, "Deleted segment's membership rows should be gone");
}

#[tokio::test]
async fn test_retroactive_enrollment_of_known_users() {
    let (service, _guard) = create_test_service().await;

    service.create_segment("seed", 0).await.unwrap();
    for user_id in 1..=10 {
        service
            .update_user(user_id, &names(&["seed"]), &[], 0)
            .await
            .unwrap();
    }

    service.create_segment("everyone", 100).await.unwrap();
    service.create_segment("nobody", 0).await.unwrap();

    for user_id in 1..=10 {
        let segments = service.get_segments(user_id).await.unwrap();
        assert!(
            segments.contains(&"everyone".to_string()),
            "User {} should be in the 100% segment",
            user_id
        );
        assert!(!segments.contains(&"nobody".to_string()));
    }

    // Users never seen before are not touched
    assert!(service.get_segments(11).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_retroactive_enrollment_samples_a_share() {
    let (service, _guard) = create_test_service().await;

    service.create_segment("seed", 0).await.unwrap();
    for user_id in 1..=11 {
        service
            .update_user(user_id, &names(&["seed"]), &[], 0)
            .await
            .unwrap();
    }

    service.create_segment("half", 50).await.unwrap();

    let mut enrolled = 0;
    for user_id in 1..=11 {
        if service
            .get_segments(user_id)
            .await
            .unwrap()
            .contains(&"half".to_string())
        {
            enrolled += 1;
        }
    }
    assert_eq!(enrolled, 5, "Ranks 0.0..0.4 of 11 users fall below 0.5");

    let added: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM operation_history h \
         JOIN segments s ON s.id = h.segment_id \
         WHERE s.name = 'half' AND h.operation = 'add'",
    )
    .fetch_one(service.pool())
    .await
    .unwrap();
    assert_eq!(added, 5);
}
