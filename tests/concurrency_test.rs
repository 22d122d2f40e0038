mod common;

use common::{create_test_service, names};
use segment_service::SegmentError;

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_updates_all_succeed() {
    let (service, _guard) = create_test_service().await;
    for name in ["s0", "s1", "s2", "s3"] {
        service.create_segment(name, 0).await.unwrap();
    }

    let mut handles = Vec::new();
    for user_id in 1..=40 {
        let service = service.clone();
        handles.push(tokio::spawn(async move {
            service
                .update_user(user_id, &names(&["s0", "s1", "s2"]), &names(&["s3"]), 0)
                .await
        }));
    }

    for handle in handles {
        let result = handle.await.unwrap();
        assert!(result.is_ok(), "Concurrent update failed: {:?}", result);
    }

    for user_id in 1..=40 {
        assert_eq!(
            service.get_segments(user_id).await.unwrap(),
            names(&["s0", "s1", "s2"])
        );
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_racing_deletes_resolve_to_already_deleted() {
    let (service, _guard) = create_test_service().await;

    for round in 0..20 {
        let name = format!("seg-{}", round);
        service.create_segment(&name, 0).await.unwrap();

        let first = {
            let service = service.clone();
            let name = name.clone();
            tokio::spawn(async move { service.delete_segment(&name).await })
        };
        let second = {
            let service = service.clone();
            let name = name.clone();
            tokio::spawn(async move { service.delete_segment(&name).await })
        };

        let results = [first.await.unwrap(), second.await.unwrap()];
        let deleted = results.iter().filter(|r| r.is_ok()).count();
        let already = results
            .iter()
            .filter(|r| matches!(r, Err(SegmentError::AlreadyDeleted)))
            .count();
        assert_eq!(
            (deleted, already),
            (1, 1),
            "Round {}: expected one delete and one AlreadyDeleted, got {:?}",
            round,
            results
        );
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_creates_of_one_name() {
    let (service, _guard) = create_test_service().await;

    let mut handles = Vec::new();
    for _ in 0..8 {
        let service = service.clone();
        handles.push(tokio::spawn(async move { service.create_segment("shared", 0).await }));
    }

    let mut created = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(()) => created += 1,
            Err(SegmentError::NameTaken) => {}
            Err(e) => panic!("Unexpected error: {:?}", e),
        }
    }
    assert_eq!(created, 1);
}
