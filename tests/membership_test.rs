mod common;

use common::{create_test_service, names};
use segment_service::SegmentError;

#[tokio::test]
async fn test_update_user_round_trip() {
    let (service, _guard) = create_test_service().await;

    for name in ["AVITO_VOICE_MESSAGES", "AVITO_PERFORMANCE_VAS", "AVITO_DISCOUNT_30"] {
        service.create_segment(name, 0).await.unwrap();
    }

    service
        .update_user(
            1000,
            &names(&["AVITO_VOICE_MESSAGES", "AVITO_PERFORMANCE_VAS", "AVITO_DISCOUNT_30"]),
            &[],
            0,
        )
        .await
        .unwrap();
    service
        .update_user(1000, &[], &names(&["AVITO_PERFORMANCE_VAS"]), 0)
        .await
        .unwrap();

    assert_eq!(
        service.get_segments(1000).await.unwrap(),
        names(&["AVITO_DISCOUNT_30", "AVITO_VOICE_MESSAGES"])
    );
}

#[tokio::test]
async fn test_unknown_user_has_no_segments() {
    let (service, _guard) = create_test_service().await;
    assert!(service.get_segments(42).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_adding_twice_and_removing_absent_are_noops() {
    let (service, _guard) = create_test_service().await;
    service.create_segment("A", 0).await.unwrap();
    service.create_segment("B", 0).await.unwrap();

    service.update_user(7, &names(&["A"]), &[], 0).await.unwrap();
    service.update_user(7, &names(&["A"]), &[], 0).await.unwrap();
    service.update_user(7, &[], &names(&["B"]), 0).await.unwrap();

    assert_eq!(service.get_segments(7).await.unwrap(), names(&["A"]));
}

#[tokio::test]
async fn test_update_with_unknown_segment_rolls_back() {
    let (service, _guard) = create_test_service().await;
    service.create_segment("A", 0).await.unwrap();

    let result = service
        .update_user(5, &names(&["A", "missing"]), &[], 0)
        .await;
    assert!(matches!(result, Err(SegmentError::NameFree)));

    assert!(
        service.get_segments(5).await.unwrap().is_empty(),
        "Add of A must not survive the failed update"
    );
    let history: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM operation_history")
        .fetch_one(service.pool())
        .await
        .unwrap();
    assert_eq!(history, 0);
}

#[tokio::test]
async fn test_update_with_deleted_segment_rolls_back() {
    let (service, _guard) = create_test_service().await;
    service.create_segment("A", 0).await.unwrap();
    service.create_segment("gone", 0).await.unwrap();
    service.delete_segment("gone").await.unwrap();

    let result = service
        .update_user(5, &names(&["A"]), &names(&["gone"]), 0)
        .await;
    assert!(matches!(result, Err(SegmentError::AlreadyDeleted)));
    assert!(service.get_segments(5).await.unwrap().is_empty());

    let result = service.update_user(5, &names(&["gone"]), &[], 0).await;
    assert!(matches!(result, Err(SegmentError::AlreadyDeleted)));
}

#[tokio::test]
async fn test_failed_update_leaves_no_schedule_rows() {
    let (service, _guard) = create_test_service().await;
    service.create_segment("A", 0).await.unwrap();

    let result = service
        .update_user(9, &names(&["A"]), &names(&["missing"]), 3600)
        .await;
    assert!(matches!(result, Err(SegmentError::NameFree)));

    assert_eq!(service.scheduler().pending_count().await.unwrap(), 0);
    assert!(service.get_segments(9).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_automatic_enrollment_bounds() {
    let (service, _guard) = create_test_service().await;
    service.create_segment("always", 100).await.unwrap();
    service.create_segment("never", 0).await.unwrap();

    for user_id in 1..=20 {
        service.update_user(user_id, &[], &[], 0).await.unwrap();
        assert_eq!(
            service.get_segments(user_id).await.unwrap(),
            names(&["always"]),
            "User {} should land in the 100% segment only",
            user_id
        );
    }
}

#[tokio::test]
async fn test_automatic_enrollment_uses_one_draw_per_update() {
    let (service, _guard) = create_test_service().await;
    service.create_segment("thirty", 30).await.unwrap();
    service.create_segment("seventy", 70).await.unwrap();

    let mut in_thirty = 0;
    let mut in_seventy = 0;
    for user_id in 1..=200 {
        service.update_user(user_id, &[], &[], 0).await.unwrap();
        let segments = service.get_segments(user_id).await.unwrap();
        let thirty = segments.contains(&"thirty".to_string());
        let seventy = segments.contains(&"seventy".to_string());
        if thirty {
            in_thirty += 1;
            assert!(
                seventy,
                "User {} drew below 30 and so must also be in the 70% segment",
                user_id
            );
        }
        if seventy {
            in_seventy += 1;
        }
    }

    assert!(in_thirty > 0, "200 draws should put someone in the 30% segment");
    assert!(in_seventy > in_thirty);
}

#[tokio::test]
async fn test_automatic_enrollment_skips_deleted_segments() {
    let (service, _guard) = create_test_service().await;
    service.create_segment("always", 100).await.unwrap();
    service.delete_segment("always").await.unwrap();

    service.update_user(3, &[], &[], 0).await.unwrap();
    assert!(service.get_segments(3).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_history_records_each_change() {
    let (service, _guard) = create_test_service().await;
    service.create_segment("A", 0).await.unwrap();

    service.update_user(1, &names(&["A"]), &[], 0).await.unwrap();
    service.update_user(1, &[], &names(&["A"]), 0).await.unwrap();

    let ops: Vec<String> = sqlx::query_scalar(
        "SELECT operation FROM operation_history WHERE user_id = 1 ORDER BY id",
    )
    .fetch_all(service.pool())
    .await
    .unwrap();
    assert_eq!(ops, vec!["add".to_string(), "remove".to_string()]);
}
