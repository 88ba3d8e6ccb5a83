use assert_matches::assert_matches;
use chrono::{DateTime, Duration, TimeZone, Utc};
use serde_json::json;
use uuid::Uuid;
use wiremock::matchers::{any, body_partial_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use appointment_cell::models::{
    Appointment, AppointmentError, AppointmentSearchQuery, AppointmentStatus,
    BookAppointmentRequest, RescheduleAppointmentRequest, SortOrder, StatusFilter,
};
use appointment_cell::services::appointments::{sort_by_date, AppointmentService};
use shared_utils::test_utils::{MockStoreResponses, TestConfig};

fn service_for(server: &MockServer) -> AppointmentService {
    let config = TestConfig::with_store_url(&server.uri()).to_app_config();
    AppointmentService::new(&config)
}

fn appointment(date_time: DateTime<Utc>, status: AppointmentStatus) -> Appointment {
    Appointment {
        id: Uuid::new_v4(),
        patient_id: Uuid::new_v4(),
        doctor_id: Uuid::new_v4(),
        date_time,
        status,
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
}

async fn mount_get_appointment(server: &MockServer, appointment: &Appointment) {
    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .and(query_param("id", format!("eq.{}", appointment.id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockStoreResponses::appointment_response(
                appointment.id,
                appointment.patient_id,
                appointment.doctor_id,
                appointment.date_time,
                appointment.status.as_str(),
            )
        ])))
        .mount(server)
        .await;
}

// ==============================================================================
// RESCHEDULE
// ==============================================================================

#[tokio::test]
async fn test_reschedule_into_past_is_rejected_locally() {
    let mock_server = MockServer::start().await;

    // A past instant must be rejected before any store round-trip
    Mock::given(any())
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(&mock_server)
        .await;

    let service = service_for(&mock_server);
    let request = RescheduleAppointmentRequest {
        doctor_id: Uuid::new_v4(),
        patient_id: Uuid::new_v4(),
        date_time: Utc::now() - Duration::seconds(1),
    };

    let result = service
        .reschedule_appointment(Uuid::new_v4(), request, "test-token")
        .await;

    assert_matches!(result, Err(AppointmentError::Validation(_)));
    mock_server.verify().await;
}

#[tokio::test]
async fn test_reschedule_moves_scheduled_appointment() {
    let mock_server = MockServer::start().await;
    let current = appointment(Utc::now() + Duration::days(2), AppointmentStatus::Scheduled);
    let new_time = Utc::now() + Duration::days(5);

    mount_get_appointment(&mock_server, &current).await;

    Mock::given(method("PATCH"))
        .and(path("/rest/v1/appointments"))
        .and(query_param("id", format!("eq.{}", current.id)))
        .and(body_partial_json(json!({ "date_time": new_time.to_rfc3339() })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockStoreResponses::appointment_response(
                current.id,
                current.patient_id,
                current.doctor_id,
                new_time,
                "scheduled",
            )
        ])))
        .expect(1)
        .mount(&mock_server)
        .await;

    let service = service_for(&mock_server);
    let request = RescheduleAppointmentRequest {
        doctor_id: current.doctor_id,
        patient_id: current.patient_id,
        date_time: new_time,
    };

    let updated = service
        .reschedule_appointment(current.id, request, "test-token")
        .await
        .expect("reschedule should succeed");

    assert_eq!(updated.date_time, new_time);
    assert_eq!(updated.status, AppointmentStatus::Scheduled);
}

#[tokio::test]
async fn test_reschedule_rejected_once_checked_in() {
    let mock_server = MockServer::start().await;
    let current = appointment(Utc::now() + Duration::hours(1), AppointmentStatus::CheckedIn);

    mount_get_appointment(&mock_server, &current).await;

    Mock::given(method("PATCH"))
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(&mock_server)
        .await;

    let service = service_for(&mock_server);
    let request = RescheduleAppointmentRequest {
        doctor_id: current.doctor_id,
        patient_id: current.patient_id,
        date_time: Utc::now() + Duration::days(1),
    };

    let result = service
        .reschedule_appointment(current.id, request, "test-token")
        .await;

    assert_matches!(result, Err(AppointmentError::TransitionRejected { .. }));
    mock_server.verify().await;
}

// ==============================================================================
// BOOKING
// ==============================================================================

#[tokio::test]
async fn test_book_in_past_is_rejected_locally() {
    let mock_server = MockServer::start().await;

    Mock::given(any())
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(&mock_server)
        .await;

    let service = service_for(&mock_server);
    let request = BookAppointmentRequest {
        doctor_id: Uuid::new_v4(),
        patient_id: Uuid::new_v4(),
        date_time: Utc::now() - Duration::minutes(5),
    };

    let result = service.book_appointment(request, "test-token").await;

    assert_matches!(result, Err(AppointmentError::Validation(_)));
    mock_server.verify().await;
}

#[tokio::test]
async fn test_book_creates_scheduled_appointment() {
    let mock_server = MockServer::start().await;
    let patient_id = Uuid::new_v4();
    let doctor_id = Uuid::new_v4();
    let date_time = Utc::now() + Duration::days(3);

    Mock::given(method("POST"))
        .and(path("/rest/v1/appointments"))
        .and(header("Authorization", "Bearer test-token"))
        .and(body_partial_json(json!({ "status": "scheduled" })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([
            MockStoreResponses::appointment_response(
                Uuid::new_v4(),
                patient_id,
                doctor_id,
                date_time,
                "scheduled",
            )
        ])))
        .expect(1)
        .mount(&mock_server)
        .await;

    let service = service_for(&mock_server);
    let request = BookAppointmentRequest {
        doctor_id,
        patient_id,
        date_time,
    };

    let appointment = service
        .book_appointment(request, "test-token")
        .await
        .expect("booking should succeed");

    assert_eq!(appointment.status, AppointmentStatus::Scheduled);
    assert_eq!(appointment.patient_id, patient_id);
}

// ==============================================================================
// COMPLETE / CANCEL
// ==============================================================================

#[tokio::test]
async fn test_complete_from_checked_in() {
    let mock_server = MockServer::start().await;
    let current = appointment(Utc::now(), AppointmentStatus::CheckedIn);

    mount_get_appointment(&mock_server, &current).await;

    Mock::given(method("PATCH"))
        .and(path("/rest/v1/appointments"))
        .and(query_param("id", format!("eq.{}", current.id)))
        .and(body_partial_json(json!({ "status": "completed" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockStoreResponses::appointment_response(
                current.id,
                current.patient_id,
                current.doctor_id,
                current.date_time,
                "completed",
            )
        ])))
        .expect(1)
        .mount(&mock_server)
        .await;

    let service = service_for(&mock_server);
    let completed = service
        .complete_appointment(current.id, "test-token")
        .await
        .expect("completion should succeed");

    assert_eq!(completed.status, AppointmentStatus::Completed);
}

#[tokio::test]
async fn test_cancel_rejected_for_completed_appointment() {
    let mock_server = MockServer::start().await;
    let current = appointment(Utc::now() - Duration::hours(2), AppointmentStatus::Completed);

    mount_get_appointment(&mock_server, &current).await;

    // Terminal state: the rejection happens locally, no write goes out
    Mock::given(method("PATCH"))
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(&mock_server)
        .await;

    let service = service_for(&mock_server);
    let result = service.cancel_appointment(current.id, "test-token").await;

    assert_matches!(
        result,
        Err(AppointmentError::TransitionRejected { from, to })
            if from == AppointmentStatus::Completed && to == AppointmentStatus::Cancelled
    );
    mock_server.verify().await;
}

#[tokio::test]
async fn test_get_appointment_not_found() {
    let mock_server = MockServer::start().await;
    let missing_id = Uuid::new_v4();

    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .and(query_param("id", format!("eq.{}", missing_id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&mock_server)
        .await;

    let service = service_for(&mock_server);
    let result = service.get_appointment(missing_id, "test-token").await;

    assert_matches!(result, Err(AppointmentError::NotFound));
}

// ==============================================================================
// DELETE (ADMIN PURGE)
// ==============================================================================

#[tokio::test]
async fn test_delete_too_recent_is_rejected() {
    let mock_server = MockServer::start().await;
    let two_years_ago = Utc::now() - Duration::days(365 * 2);
    let current = appointment(two_years_ago, AppointmentStatus::Completed);

    mount_get_appointment(&mock_server, &current).await;

    Mock::given(method("DELETE"))
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(&mock_server)
        .await;

    let service = service_for(&mock_server);
    let result = service.delete_appointment(current.id, "test-token").await;

    assert_matches!(result, Err(AppointmentError::Validation(_)));
    mock_server.verify().await;
}

#[tokio::test]
async fn test_delete_old_record_is_permitted() {
    let mock_server = MockServer::start().await;
    let four_years_ago = Utc::now() - Duration::days(365 * 4 + 30);
    let current = appointment(four_years_ago, AppointmentStatus::Cancelled);

    mount_get_appointment(&mock_server, &current).await;

    Mock::given(method("DELETE"))
        .and(path("/rest/v1/appointments"))
        .and(query_param("id", format!("eq.{}", current.id)))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&mock_server)
        .await;

    let service = service_for(&mock_server);
    service
        .delete_appointment(current.id, "test-token")
        .await
        .expect("purge of an old record should succeed");
}

// ==============================================================================
// SEARCH & SORT
// ==============================================================================

#[tokio::test]
async fn test_search_sends_status_union_as_set() {
    let mock_server = MockServer::start().await;
    let patient_id = Uuid::new_v4();

    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .and(query_param("patient_id", format!("eq.{}", patient_id)))
        .and(query_param("status", "in.(scheduled,checked-in)"))
        .and(query_param("order", "date_time.asc"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(1)
        .mount(&mock_server)
        .await;

    let service = service_for(&mock_server);
    let query = AppointmentSearchQuery {
        patient_id: Some(patient_id),
        status: Some(StatusFilter::any_of([
            AppointmentStatus::Scheduled,
            AppointmentStatus::CheckedIn,
        ])),
        ..Default::default()
    };

    let results = service
        .search_appointments(query, "test-token")
        .await
        .expect("search should succeed");

    assert!(results.is_empty());
    mock_server.verify().await;
}

#[tokio::test]
async fn test_search_single_status_and_descending_order() {
    let mock_server = MockServer::start().await;
    let doctor_id = Uuid::new_v4();

    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .and(query_param("doctor_id", format!("eq.{}", doctor_id)))
        .and(query_param("status", "eq.completed"))
        .and(query_param("order", "date_time.desc"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(1)
        .mount(&mock_server)
        .await;

    let service = service_for(&mock_server);
    let query = AppointmentSearchQuery {
        doctor_id: Some(doctor_id),
        status: Some(StatusFilter::only(AppointmentStatus::Completed)),
        sort: Some(SortOrder::Desc),
        ..Default::default()
    };

    service
        .search_appointments(query, "test-token")
        .await
        .expect("search should succeed");

    mock_server.verify().await;
}

#[test]
fn test_sort_by_date_returns_new_ordering() {
    let base = Utc.with_ymd_and_hms(2025, 6, 12, 10, 0, 0).unwrap();
    let first = appointment(base, AppointmentStatus::Scheduled);
    let second = appointment(base + Duration::hours(2), AppointmentStatus::Scheduled);
    let third = appointment(base + Duration::days(1), AppointmentStatus::CheckedIn);

    let unsorted = vec![second.clone(), third.clone(), first.clone()];

    let ascending = sort_by_date(&unsorted, SortOrder::Asc);
    let descending = sort_by_date(&unsorted, SortOrder::Desc);

    assert_eq!(
        ascending.iter().map(|a| a.id).collect::<Vec<_>>(),
        vec![first.id, second.id, third.id]
    );
    assert_eq!(
        descending.iter().map(|a| a.id).collect::<Vec<_>>(),
        vec![third.id, second.id, first.id]
    );

    // The input ordering is left untouched
    assert_eq!(
        unsorted.iter().map(|a| a.id).collect::<Vec<_>>(),
        vec![second.id, third.id, first.id]
    );
}
