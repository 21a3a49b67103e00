//! Ledger integration tests against a live PostgreSQL database
//!
//! Run with: DATABASE_URL=postgres://... cargo test --test ledger_tests -- --ignored

use chrono::NaiveDate;
use rust_decimal::Decimal;
use sqlx::postgres::PgPoolOptions;
use uuid::Uuid;

use smartcontrol_server::{
    config::LedgerConfig,
    error::{AppError, Conflict, InvalidTransition},
    models::{
        audit::Actor,
        custody::{
            AmendReturnRequest, CheckOutRequest, RecordFilter, RecordPage, RecordQuery, RecordSort,
            ReturnRequest, SortDirection,
        },
        device::{CreateDevice, LinkLineRequest},
        employee::CreateEmployee,
        enums::{AuditAction, AuditResource, DeviceCondition, DeviceStatus, LineStatus, MaintenanceOutcome},
        history::DeviceHistoryEntry,
        line::{CreateLine, CreateLineTerm, UpdateLine},
        maintenance::{CloseMaintenanceRequest, SendToMaintenanceRequest},
    },
    repository::Repository,
    services::Services,
};

async fn services() -> Services {
    let url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");
    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&url)
        .await
        .expect("Failed to connect to database");
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to run migrations");
    Services::new(Repository::new(pool), LedgerConfig::default())
}

fn actor() -> Actor {
    Actor {
        id: Some(1),
        name: "ledger-test".to_string(),
    }
}

fn unique(prefix: &str) -> String {
    format!("{}-{}", prefix, &Uuid::new_v4().simple().to_string()[..12])
}

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

async fn employee(services: &Services) -> String {
    let matricula = unique("E");
    services
        .employees
        .create(
            CreateEmployee {
                matricula: matricula.clone(),
                name: format!("Employee {}", matricula),
                position: "Analyst".to_string(),
                email: None,
            },
            &actor(),
        )
        .await
        .expect("Failed to create employee");
    matricula
}

async fn device(services: &Services) -> String {
    let imei = unique("IMEI");
    services
        .devices
        .create(
            CreateDevice {
                imei1: imei.clone(),
                imei2: None,
                model: "Moto G84".to_string(),
                notes: None,
                condition: None,
            },
            &actor(),
        )
        .await
        .expect("Failed to create device");
    imei
}

async fn is_eligible(services: &Services, imei: &str) -> bool {
    services
        .devices
        .eligible_for_maintenance()
        .await
        .unwrap()
        .iter()
        .any(|d| d.imei1 == imei)
}

async fn line(services: &Services) -> String {
    let numero = unique("L");
    services
        .lines
        .create(
            CreateLine {
                numero: numero.clone(),
                carrier: "Vivo".to_string(),
                plan: None,
                status: None,
            },
            &actor(),
        )
        .await
        .expect("Failed to create line");
    numero
}

async fn link(services: &Services, imei: &str, numero: &str) -> Result<(), AppError> {
    services
        .lines
        .link(
            imei,
            LinkLineRequest {
                line_numero: numero.to_string(),
            },
            &actor(),
        )
        .await
        .map(|_| ())
}

/// One page of two records of a single employee, by delivery date
async fn list_page(
    services: &Services,
    matricula: &str,
    filter: RecordFilter,
    direction: SortDirection,
    page: i64,
) -> RecordPage {
    services
        .custody
        .list(RecordQuery {
            filter: Some(filter),
            employee_matricula: Some(matricula.to_string()),
            sort: Some(RecordSort::DeliveryDate),
            direction: Some(direction),
            page: Some(page),
            page_size: Some(2),
        })
        .await
        .unwrap()
}

fn check_out_request(matricula: &str, imei: &str, delivery: NaiveDate) -> CheckOutRequest {
    CheckOutRequest {
        employee_matricula: Some(matricula.to_string()),
        device_imei: Some(imei.to_string()),
        delivery_date: Some(delivery),
        delivery_condition: Some("New".to_string()),
        delivery_notes: None,
        delivered_by: None,
        delivery_attachment_url: None,
        accessories: vec!["charger".to_string()],
    }
}

fn return_request(on: NaiveDate) -> ReturnRequest {
    ReturnRequest {
        return_date: Some(on),
        return_condition: Some("Good".to_string()),
        return_notes: None,
        received_by: None,
        return_attachment_url: None,
    }
}

fn send_request(imei: &str, on: NaiveDate) -> SendToMaintenanceRequest {
    SendToMaintenanceRequest {
        device_imei: Some(imei.to_string()),
        send_date: Some(on),
        reported_defect: Some("Does not charge".to_string()),
        supplier: Some("Assistência Técnica".to_string()),
    }
}

fn close_request(on: NaiveDate) -> CloseMaintenanceRequest {
    CloseMaintenanceRequest {
        return_date: Some(on),
        outcome: Some(MaintenanceOutcome::Completed),
        post_condition: Some(DeviceCondition::ApprovedForUse),
        service_performed: Some("Charging port replaced".to_string()),
        cost: Some(Decimal::new(8990, 2)),
    }
}

#[tokio::test]
#[ignore]
async fn check_out_then_return_frees_the_device() {
    let services = services().await;
    let matricula = employee(&services).await;
    let imei = device(&services).await;

    let outcome = services
        .custody
        .check_out(check_out_request(&matricula, &imei, date(2024, 1, 10)), &actor())
        .await
        .unwrap();
    assert!(outcome.created);
    assert_eq!(services.devices.get(&imei).await.unwrap().status, DeviceStatus::InUse);

    let record = services
        .custody
        .return_device(outcome.record.id, return_request(date(2024, 2, 1)), &actor())
        .await
        .unwrap();
    assert!(!record.is_open());
    assert_eq!(record.return_info.as_ref().unwrap().received_by, "ledger-test");
    assert_eq!(services.devices.get(&imei).await.unwrap().status, DeviceStatus::Available);

    let history = services.history.employee(&matricula).await.unwrap();
    assert_eq!(history.len(), 1);
    assert!(history[0].record.return_info.is_some());
}

#[tokio::test]
#[ignore]
async fn second_employee_scenario() {
    // E001 holds the device, E002 is refused until it comes back
    let services = services().await;
    let first = employee(&services).await;
    let second = employee(&services).await;
    let imei = device(&services).await;

    let held = services
        .custody
        .check_out(check_out_request(&first, &imei, date(2024, 1, 10)), &actor())
        .await
        .unwrap()
        .record;

    for _ in 0..2 {
        let err = services
            .custody
            .check_out(check_out_request(&second, &imei, date(2024, 1, 15)), &actor())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            AppError::Conflict(Conflict::DeviceAlreadyAssigned { conflicting_record_id }) if conflicting_record_id == held.id
        ));
    }

    services
        .custody
        .return_device(held.id, return_request(date(2024, 2, 1)), &actor())
        .await
        .unwrap();

    let next = services
        .custody
        .check_out(check_out_request(&second, &imei, date(2024, 2, 2)), &actor())
        .await
        .unwrap();
    assert!(next.created);
    assert_ne!(next.record.id, held.id);

    let timeline = services.history.device(&imei).await.unwrap();
    assert_eq!(timeline.len(), 2);
    assert!(!timeline[0].is_ongoing());
    assert!(timeline[1].is_ongoing());
}

#[tokio::test]
#[ignore]
async fn maintenance_window_scenario() {
    let services = services().await;
    let matricula = employee(&services).await;
    let imei = device(&services).await;
    assert!(is_eligible(&services, &imei).await);

    let order = services
        .maintenance
        .send(send_request(&imei, date(2024, 3, 1)), &actor())
        .await
        .unwrap();
    assert!(order.order_number.starts_with("OS-2024-"));
    assert!(!is_eligible(&services, &imei).await);

    let device = services.devices.get(&imei).await.unwrap();
    assert_eq!(device.status, DeviceStatus::Unavailable);
    assert_eq!(device.condition, DeviceCondition::InMaintenance);

    let err = services
        .custody
        .check_out(check_out_request(&matricula, &imei, date(2024, 3, 5)), &actor())
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        AppError::Conflict(Conflict::DeviceUnderMaintenance { conflicting_order_id }) if conflicting_order_id == order.id
    ));

    let closed = services
        .maintenance
        .close(order.id, close_request(date(2024, 3, 10)), &actor())
        .await
        .unwrap();
    assert!(!closed.is_open());

    let device = services.devices.get(&imei).await.unwrap();
    assert_eq!(device.status, DeviceStatus::Available);
    assert_eq!(device.condition, DeviceCondition::ApprovedForUse);
    assert!(is_eligible(&services, &imei).await);

    services
        .custody
        .check_out(check_out_request(&matricula, &imei, date(2024, 3, 12)), &actor())
        .await
        .unwrap();
    assert!(!is_eligible(&services, &imei).await);

    let timeline = services.history.device(&imei).await.unwrap();
    assert!(matches!(timeline[0], DeviceHistoryEntry::Maintenance { .. }));
    assert!(matches!(timeline[1], DeviceHistoryEntry::Custody { .. }));
}

#[tokio::test]
#[ignore]
async fn device_in_custody_cannot_go_to_maintenance() {
    let services = services().await;
    let matricula = employee(&services).await;
    let imei = device(&services).await;

    let record = services
        .custody
        .check_out(check_out_request(&matricula, &imei, date(2024, 1, 10)), &actor())
        .await
        .unwrap()
        .record;

    let err = services
        .maintenance
        .send(send_request(&imei, date(2024, 1, 20)), &actor())
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        AppError::Conflict(Conflict::DeviceAlreadyAssigned { conflicting_record_id }) if conflicting_record_id == record.id
    ));
    assert_eq!(services.devices.get(&imei).await.unwrap().status, DeviceStatus::InUse);
}

#[tokio::test]
#[ignore]
async fn concurrent_check_outs_leave_one_open_record() {
    let services = services().await;
    let first = employee(&services).await;
    let second = employee(&services).await;
    let imei = device(&services).await;

    let actor = actor();
    let (a, b) = tokio::join!(
        services
            .custody
            .check_out(check_out_request(&first, &imei, date(2024, 5, 2)), &actor),
        services
            .custody
            .check_out(check_out_request(&second, &imei, date(2024, 5, 2)), &actor),
    );

    let (winner, loser) = match (a, b) {
        (Ok(winner), Err(loser)) | (Err(loser), Ok(winner)) => (winner, loser),
        other => panic!("expected exactly one success, got {:?}", other),
    };
    assert!(matches!(
        loser,
        AppError::Conflict(Conflict::DeviceAlreadyAssigned { conflicting_record_id }) if conflicting_record_id == winner.record.id
    ));

    let open = services
        .history
        .device(&imei)
        .await
        .unwrap()
        .into_iter()
        .filter(|e| e.is_ongoing())
        .count();
    assert_eq!(open, 1);
}

#[tokio::test]
#[ignore]
async fn concurrent_sends_open_one_order() {
    let services = services().await;
    let imei = device(&services).await;

    let actor = actor();
    let (a, b) = tokio::join!(
        services
            .maintenance
            .send(send_request(&imei, date(2024, 5, 3)), &actor),
        services
            .maintenance
            .send(send_request(&imei, date(2024, 5, 3)), &actor),
    );

    let (winner, loser) = match (a, b) {
        (Ok(winner), Err(loser)) | (Err(loser), Ok(winner)) => (winner, loser),
        other => panic!("expected exactly one success, got {:?}", other),
    };
    assert!(matches!(
        loser,
        AppError::Conflict(Conflict::DeviceUnderMaintenance { conflicting_order_id }) if conflicting_order_id == winner.id
    ));
    assert_eq!(
        services.devices.get(&imei).await.unwrap().condition,
        DeviceCondition::InMaintenance
    );
}

#[tokio::test]
#[ignore]
async fn return_twice_keeps_first_return() {
    let services = services().await;
    let matricula = employee(&services).await;
    let imei = device(&services).await;

    let record = services
        .custody
        .check_out(check_out_request(&matricula, &imei, date(2024, 1, 10)), &actor())
        .await
        .unwrap()
        .record;
    services
        .custody
        .return_device(record.id, return_request(date(2024, 2, 1)), &actor())
        .await
        .unwrap();

    let err = services
        .custody
        .return_device(record.id, return_request(date(2024, 2, 5)), &actor())
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        AppError::InvalidTransition(InvalidTransition::AlreadyReturned { .. })
    ));

    let stored = services.custody.get(record.id).await.unwrap();
    assert_eq!(stored.record.return_info.unwrap().date, date(2024, 2, 1));
}

#[tokio::test]
#[ignore]
async fn return_before_delivery_is_rejected() {
    let services = services().await;
    let matricula = employee(&services).await;
    let imei = device(&services).await;

    let record = services
        .custody
        .check_out(check_out_request(&matricula, &imei, date(2024, 1, 10)), &actor())
        .await
        .unwrap()
        .record;

    let err = services
        .custody
        .return_device(record.id, return_request(date(2024, 1, 9)), &actor())
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));
}

#[tokio::test]
#[ignore]
async fn amend_requires_a_returned_record() {
    let services = services().await;
    let matricula = employee(&services).await;
    let imei = device(&services).await;

    let record = services
        .custody
        .check_out(check_out_request(&matricula, &imei, date(2024, 1, 10)), &actor())
        .await
        .unwrap()
        .record;

    let amendment = || AmendReturnRequest {
        return_date: None,
        return_condition: Some("Scratched".to_string()),
        return_notes: None,
        received_by: None,
    };

    let err = services
        .custody
        .amend_return(record.id, amendment(), &actor())
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        AppError::InvalidTransition(InvalidTransition::NotReturned { .. })
    ));

    services
        .custody
        .return_device(record.id, return_request(date(2024, 2, 1)), &actor())
        .await
        .unwrap();
    let amended = services
        .custody
        .amend_return(record.id, amendment(), &actor())
        .await
        .unwrap();
    assert_eq!(amended.return_info.unwrap().condition, "Scratched");
}

#[tokio::test]
#[ignore]
async fn order_numbers_restart_each_year() {
    let services = services().await;
    // A year no other test touches, so its counter starts fresh
    let year = 3000 + (Uuid::new_v4().as_u128() % 6000) as i32;

    let mut numbers = Vec::new();
    for _ in 0..2 {
        let imei = device(&services).await;
        let order = services
            .maintenance
            .send(send_request(&imei, date(year, 6, 1)), &actor())
            .await
            .unwrap();
        numbers.push(order.order_number);
    }

    assert_eq!(numbers[0], format!("OS-{}-00001", year));
    assert_eq!(numbers[1], format!("OS-{}-00002", year));
}

#[tokio::test]
#[ignore]
async fn relinking_a_line_moves_it() {
    let services = services().await;
    let first = device(&services).await;
    let second = device(&services).await;
    let numero = unique("L");

    services
        .lines
        .create(
            CreateLine {
                numero: numero.clone(),
                carrier: "Vivo".to_string(),
                plan: None,
                status: None,
            },
            &actor(),
        )
        .await
        .unwrap();

    for imei in [&first, &second] {
        services
            .lines
            .link(
                imei,
                LinkLineRequest {
                    line_numero: numero.clone(),
                },
                &actor(),
            )
            .await
            .unwrap();
    }

    let line = services.lines.get(&numero).await.unwrap();
    assert_eq!(line.linked_device_imei.as_deref(), Some(second.as_str()));
    assert_eq!(services.devices.get(&first).await.unwrap().line_numero, None);
    assert_eq!(
        services.devices.get(&second).await.unwrap().line_numero.as_deref(),
        Some(numero.as_str())
    );

    let links = services.lines.history(&numero).await.unwrap();
    assert_eq!(links.len(), 2);
    assert!(links[0].unlinked_at.is_some());
    assert!(links[1].unlinked_at.is_none());

    let err = services.lines.delete(&numero, &actor()).await.unwrap_err();
    assert!(matches!(
        err,
        AppError::InvalidTransition(InvalidTransition::LineLinked { .. })
    ));

    services.lines.unlink(&numero, &actor()).await.unwrap();
    let err = services.lines.unlink(&numero, &actor()).await.unwrap_err();
    assert!(matches!(
        err,
        AppError::InvalidTransition(InvalidTransition::LineNotLinked { .. })
    ));
}

#[tokio::test]
#[ignore]
async fn deleting_an_employee_with_a_device_is_refused() {
    let services = services().await;
    let matricula = employee(&services).await;
    let imei = device(&services).await;

    let record = services
        .custody
        .check_out(check_out_request(&matricula, &imei, date(2024, 1, 10)), &actor())
        .await
        .unwrap()
        .record;

    let err = services.employees.delete(&matricula, &actor()).await.unwrap_err();
    assert!(matches!(
        err,
        AppError::InvalidTransition(InvalidTransition::OpenCustodyExists { record_id }) if record_id == record.id
    ));

    services
        .custody
        .return_device(record.id, return_request(date(2024, 1, 20)), &actor())
        .await
        .unwrap();
    let err = services.employees.delete(&matricula, &actor()).await.unwrap_err();
    assert!(matches!(
        err,
        AppError::InvalidTransition(InvalidTransition::HistoryExists { .. })
    ));
}

#[tokio::test]
#[ignore]
async fn administrative_delete_frees_the_device() {
    let services = services().await;
    let matricula = employee(&services).await;
    let imei = device(&services).await;

    let record = services
        .custody
        .check_out(check_out_request(&matricula, &imei, date(2024, 1, 10)), &actor())
        .await
        .unwrap()
        .record;

    services
        .custody
        .delete(record.id, Some("Registered by mistake".to_string()), &actor())
        .await
        .unwrap();

    assert_eq!(services.devices.get(&imei).await.unwrap().status, DeviceStatus::Available);
    assert!(matches!(
        services.custody.get(record.id).await,
        Err(AppError::NotFound(_))
    ));

    let trail = services
        .history
        .audit_trail(
            AuditResource::CustodyRecord,
            &record.id.to_string(),
        )
        .await
        .unwrap();
    assert_eq!(trail.len(), 2);
    assert_eq!(trail[0].details["reason"], "Registered by mistake");
}

#[tokio::test]
#[ignore]
async fn record_listing_filters_sorts_and_pages() {
    let services = services().await;
    let matricula = employee(&services).await;

    let mut ids = Vec::new();
    for day in 1..=3 {
        let imei = device(&services).await;
        let record = services
            .custody
            .check_out(check_out_request(&matricula, &imei, date(2024, 1, day)), &actor())
            .await
            .unwrap()
            .record;
        ids.push(record.id);
    }
    services
        .custody
        .return_device(ids[0], return_request(date(2024, 1, 10)), &actor())
        .await
        .unwrap();

    let record_ids = |page: &RecordPage| page.records.iter().map(|r| r.record.id).collect::<Vec<_>>();
    let list = |filter, direction, page| list_page(&services, &matricula, filter, direction, page);

    let all = list(RecordFilter::All, SortDirection::Asc, 1).await;
    assert_eq!(all.total, 3);
    assert_eq!(record_ids(&all), vec![ids[0], ids[1]]);

    let second = list(RecordFilter::All, SortDirection::Asc, 2).await;
    assert_eq!(second.total, 3);
    assert_eq!(record_ids(&second), vec![ids[2]]);

    let past_end = list(RecordFilter::All, SortDirection::Asc, 5).await;
    assert_eq!(past_end.total, 3);
    assert!(past_end.records.is_empty());

    let newest = list(RecordFilter::All, SortDirection::Desc, 1).await;
    assert_eq!(record_ids(&newest), vec![ids[2], ids[1]]);

    let in_use = list(RecordFilter::InUse, SortDirection::Asc, 1).await;
    assert_eq!(in_use.total, 2);
    assert_eq!(record_ids(&in_use), vec![ids[1], ids[2]]);

    let returned = list(RecordFilter::Returned, SortDirection::Asc, 1).await;
    assert_eq!(returned.total, 1);
    assert_eq!(record_ids(&returned), vec![ids[0]]);
    assert_eq!(returned.records[0].employee_name, format!("Employee {}", matricula));
}

#[tokio::test]
#[ignore]
async fn page_beyond_offset_range_is_rejected() {
    let services = services().await;

    let err = services
        .custody
        .list(RecordQuery {
            page: Some(i64::MAX),
            ..Default::default()
        })
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));
}

#[tokio::test]
#[ignore]
async fn swapping_lines_concurrently_settles_both_links() {
    let services = services().await;
    let first_device = device(&services).await;
    let second_device = device(&services).await;
    let x = line(&services).await;
    let y = line(&services).await;

    link(&services, &first_device, &x).await.unwrap();
    link(&services, &second_device, &y).await.unwrap();

    for round in 0..10 {
        // Even rounds move x to the second device and y to the first; odd rounds swap back
        let (x_target, y_target) = if round % 2 == 0 {
            (&second_device, &first_device)
        } else {
            (&first_device, &second_device)
        };

        let (a, b) = tokio::join!(link(&services, x_target, &x), link(&services, y_target, &y));
        assert!(a.is_ok(), "round {}: {:?}", round, a);
        assert!(b.is_ok(), "round {}: {:?}", round, b);

        let x_line = services.lines.get(&x).await.unwrap();
        let y_line = services.lines.get(&y).await.unwrap();
        assert_eq!(x_line.linked_device_imei.as_deref(), Some(x_target.as_str()));
        assert_eq!(y_line.linked_device_imei.as_deref(), Some(y_target.as_str()));
    }

    for numero in [&x, &y] {
        let open_links = services
            .lines
            .history(numero)
            .await
            .unwrap()
            .into_iter()
            .filter(|l| l.unlinked_at.is_none())
            .count();
        assert_eq!(open_links, 1);
    }
}

#[tokio::test]
#[ignore]
async fn check_out_racing_employee_delete_never_fails_opaquely() {
    let services = services().await;

    for _ in 0..10 {
        let matricula = employee(&services).await;
        let imei = device(&services).await;

        let actor = actor();
        let (checked_out, deleted) = tokio::join!(
            services
                .custody
                .check_out(check_out_request(&matricula, &imei, date(2024, 6, 1)), &actor),
            services.employees.delete(&matricula, &actor),
        );

        match (checked_out, deleted) {
            (Ok(outcome), Err(err)) => assert!(
                matches!(
                    err,
                    AppError::InvalidTransition(InvalidTransition::OpenCustodyExists { record_id }) if record_id == outcome.record.id
                ),
                "unexpected delete error: {:?}",
                err
            ),
            (Err(err), Ok(())) => assert!(
                matches!(err, AppError::NotFound(_)),
                "unexpected check-out error: {:?}",
                err
            ),
            other => panic!("expected exactly one success, got {:?}", other),
        }
    }
}

#[tokio::test]
#[ignore]
async fn deleting_an_open_order_restores_the_device() {
    let services = services().await;
    let imei = unique("IMEI");
    services
        .devices
        .create(
            CreateDevice {
                imei1: imei.clone(),
                imei2: None,
                model: "Galaxy A15".to_string(),
                notes: None,
                condition: Some(DeviceCondition::Damaged),
            },
            &actor(),
        )
        .await
        .unwrap();

    let order = services
        .maintenance
        .send(send_request(&imei, date(2024, 7, 1)), &actor())
        .await
        .unwrap();
    assert_eq!(order.previous_condition, DeviceCondition::Damaged);

    services
        .maintenance
        .delete(order.id, Some("Opened on the wrong device".to_string()), &actor())
        .await
        .unwrap();

    let device = services.devices.get(&imei).await.unwrap();
    assert_eq!(device.status, DeviceStatus::Available);
    assert_eq!(device.condition, DeviceCondition::Damaged);
    assert!(matches!(
        services.maintenance.get(order.id).await,
        Err(AppError::NotFound(_))
    ));

    let trail = services
        .history
        .audit_trail(AuditResource::MaintenanceOrder, &order.id.to_string())
        .await
        .unwrap();
    assert_eq!(trail.len(), 2);
    assert_eq!(trail[0].action, AuditAction::Delete);
    assert_eq!(trail[0].details["reason"], "Opened on the wrong device");
    assert_eq!(trail[0].details["order"]["order_number"], order.order_number);
}

#[tokio::test]
#[ignore]
async fn deleting_a_closed_order_keeps_the_repaired_condition() {
    let services = services().await;
    let imei = device(&services).await;

    let order = services
        .maintenance
        .send(send_request(&imei, date(2024, 8, 1)), &actor())
        .await
        .unwrap();
    services
        .maintenance
        .close(order.id, close_request(date(2024, 8, 5)), &actor())
        .await
        .unwrap();

    services.maintenance.delete(order.id, None, &actor()).await.unwrap();

    let device = services.devices.get(&imei).await.unwrap();
    assert_eq!(device.status, DeviceStatus::Available);
    assert_eq!(device.condition, DeviceCondition::ApprovedForUse);
    assert!(services.history.device(&imei).await.unwrap().is_empty());
}

#[tokio::test]
#[ignore]
async fn new_line_term_deactivates_the_previous_one() {
    let services = services().await;
    let numero = line(&services).await;
    let first = employee(&services).await;
    let second = employee(&services).await;

    let term = |matricula: &str, on: NaiveDate| CreateLineTerm {
        employee_matricula: Some(matricula.to_string()),
        delivery_date: Some(on),
    };

    let initial = services
        .lines
        .create_term(&numero, term(&first, date(2024, 4, 1)), &actor())
        .await
        .unwrap();
    assert!(initial.active);
    assert_eq!(initial.delivered_by, "ledger-test");

    let current = services
        .lines
        .create_term(&numero, term(&second, date(2024, 5, 1)), &actor())
        .await
        .unwrap();
    assert_eq!(current.employee_name, format!("Employee {}", second));

    let terms = services.lines.terms(&numero).await.unwrap();
    assert_eq!(terms.len(), 2);
    assert_eq!(terms[0].id, current.id);
    assert!(terms[0].active);
    assert_eq!(terms[1].id, initial.id);
    assert!(!terms[1].active);
    assert!(terms[1].deactivated_at.is_some());

    let trail = services
        .history
        .audit_trail(AuditResource::LineTerm, &current.id.to_string())
        .await
        .unwrap();
    assert_eq!(trail[0].details["previous_term"], initial.id);

    let err = services
        .lines
        .create_term(&numero, term(&unique("E"), date(2024, 6, 1)), &actor())
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));

    services
        .lines
        .update(
            &numero,
            UpdateLine {
                carrier: None,
                plan: None,
                status: Some(LineStatus::Cancelled),
            },
            &actor(),
        )
        .await
        .unwrap();
    let err = services
        .lines
        .create_term(&numero, term(&first, date(2024, 7, 1)), &actor())
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        AppError::InvalidTransition(InvalidTransition::LineCancelled { .. })
    ));
}
