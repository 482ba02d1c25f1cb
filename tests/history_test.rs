mod common;

use anyhow::Result;
use garagelog::application::AppError;
use uuid::Uuid;

use common::{StandardGarage, parse_date, request, test_service};

#[tokio::test]
async fn test_history_lists_newest_first() -> Result<()> {
    let (service, _temp) = test_service().await?;
    StandardGarage::register(&service).await?;

    service
        .record_service(
            StandardGarage::PLATE,
            "engine_oil",
            parse_date("2024-01-10"),
            request("2024-01-10", 100_200),
        )
        .await?;
    service
        .record_service(
            StandardGarage::PLATE,
            "tires",
            parse_date("2024-03-05"),
            request("2024-03-05", 103_000),
        )
        .await?;
    service
        .record_service(
            StandardGarage::PLATE,
            "engine_oil",
            parse_date("2024-06-20"),
            request("2024-06-20", 107_400),
        )
        .await?;

    let entries = service.service_history(StandardGarage::PLATE, None).await?;
    assert_eq!(entries.len(), 3);
    assert_eq!(entries[0].event.date, parse_date("2024-06-20"));
    assert_eq!(entries[2].event.date, parse_date("2024-01-10"));

    let oil_only = service
        .service_history(StandardGarage::PLATE, Some("engine_oil"))
        .await?;
    assert_eq!(oil_only.len(), 2);
    assert!(oil_only.iter().all(|e| e.item_code == "engine_oil"));

    Ok(())
}

#[tokio::test]
async fn test_history_for_untracked_item_is_not_found() -> Result<()> {
    let (service, _temp) = test_service().await?;
    StandardGarage::register(&service).await?;

    let result = service
        .service_history(StandardGarage::PLATE, Some("engine_oil"))
        .await;

    assert!(matches!(result, Err(AppError::ItemNotFound { .. })));
    Ok(())
}

#[tokio::test]
async fn test_delete_unknown_event_fails_and_changes_nothing() -> Result<()> {
    let (service, _temp) = test_service().await?;
    StandardGarage::register_with_oil_change(&service).await?;

    let result = service
        .delete_service_event(StandardGarage::PLATE, "engine_oil", Uuid::new_v4(), false)
        .await;
    assert!(matches!(result, Err(AppError::ServiceEventNotFound(_))));

    let vehicle = service.get_vehicle(StandardGarage::PLATE).await?;
    let item = vehicle.item("engine_oil").unwrap();
    assert_eq!(item.history.len(), 1);
    assert_eq!(item.next_due_mileage, Some(107_700));

    Ok(())
}

#[tokio::test]
async fn test_delete_event_leaves_threshold_stale_by_default() -> Result<()> {
    let (service, _temp) = test_service().await?;
    StandardGarage::register_with_oil_change(&service).await?;

    let latest = service
        .record_service(
            StandardGarage::PLATE,
            "engine_oil",
            parse_date("2024-06-20"),
            request("2024-06-20", 107_400),
        )
        .await?;
    assert_eq!(latest.next_due_mileage, Some(114_900));

    service
        .delete_service_event(
            StandardGarage::PLATE,
            "engine_oil",
            latest.event.id,
            false,
        )
        .await?;

    let vehicle = service.get_vehicle(StandardGarage::PLATE).await?;
    let item = vehicle.item("engine_oil").unwrap();
    assert_eq!(item.history.len(), 1);
    // Stale by contract: the deleted event produced this value
    assert_eq!(item.next_due_mileage, Some(114_900));

    Ok(())
}

#[tokio::test]
async fn test_delete_event_with_recompute_rebuilds_threshold() -> Result<()> {
    let (service, _temp) = test_service().await?;
    StandardGarage::register_with_oil_change(&service).await?;

    let latest = service
        .record_service(
            StandardGarage::PLATE,
            "engine_oil",
            parse_date("2024-06-20"),
            request("2024-06-20", 107_400),
        )
        .await?;

    service
        .delete_service_event(StandardGarage::PLATE, "engine_oil", latest.event.id, true)
        .await?;

    let vehicle = service.get_vehicle(StandardGarage::PLATE).await?;
    let item = vehicle.item("engine_oil").unwrap();
    // Rebuilt from the remaining 100,200 km event
    assert_eq!(item.next_due_mileage, Some(107_700));

    Ok(())
}

#[tokio::test]
async fn test_delete_last_event_with_recompute_clears_threshold() -> Result<()> {
    let (service, _temp) = test_service().await?;
    StandardGarage::register_with_oil_change(&service).await?;

    let vehicle = service.get_vehicle(StandardGarage::PLATE).await?;
    let event_id = vehicle.item("engine_oil").unwrap().history[0].id;

    service
        .delete_service_event(StandardGarage::PLATE, "engine_oil", event_id, true)
        .await?;

    let vehicle = service.get_vehicle(StandardGarage::PLATE).await?;
    let item = vehicle.item("engine_oil").unwrap();
    assert!(item.history.is_empty());
    assert_eq!(item.next_due_mileage, None);

    Ok(())
}

#[tokio::test]
async fn test_delete_event_on_untracked_item() -> Result<()> {
    let (service, _temp) = test_service().await?;
    StandardGarage::register(&service).await?;

    let result = service
        .delete_service_event(StandardGarage::PLATE, "engine_oil", Uuid::new_v4(), false)
        .await;

    assert!(matches!(result, Err(AppError::ItemNotFound { .. })));
    Ok(())
}

#[tokio::test]
async fn test_tie_on_date_resolves_to_later_inserted() -> Result<()> {
    let (service, _temp) = test_service().await?;
    StandardGarage::register(&service).await?;

    service
        .record_service(
            StandardGarage::PLATE,
            "battery",
            parse_date("2023-06-01"),
            request("2023-06-01", 95_000),
        )
        .await?;
    let second = service
        .record_service(
            StandardGarage::PLATE,
            "battery",
            parse_date("2023-06-01"),
            request("2023-06-01", 95_010),
        )
        .await?;

    let vehicle = service.get_vehicle(StandardGarage::PLATE).await?;
    let battery = vehicle.item("battery").unwrap();
    assert_eq!(battery.last_service().unwrap().id, second.event.id);

    Ok(())
}
