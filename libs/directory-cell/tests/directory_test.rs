use std::sync::Arc;

use serde_json::json;
use uuid::Uuid;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use directory_cell::models::{DoctorProfile, PatientProfile};
use directory_cell::services::DirectoryService;
use shared_database::supabase::SupabaseClient;
use shared_utils::test_utils::{MockSupabaseResponses, TestConfig};

fn service_for(server: &MockServer) -> DirectoryService {
    let config = TestConfig::with_supabase_url(&server.uri()).to_app_config();
    DirectoryService::with_client(Arc::new(SupabaseClient::new(&config)))
}

#[tokio::test]
async fn get_doctor_returns_profile_when_present() {
    let server = MockServer::start().await;
    let doctor_id = Uuid::new_v4();
    let user_id = Uuid::new_v4();

    Mock::given(method("GET"))
        .and(path("/rest/v1/doctors"))
        .and(query_param("id", format!("eq.{}", doctor_id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockSupabaseResponses::doctor_row(
                &doctor_id.to_string(),
                &user_id.to_string(),
                "Greg",
                "House"
            )
        ])))
        .mount(&server)
        .await;

    let service = service_for(&server);
    let doctor = service
        .get_doctor(doctor_id, Some("token"))
        .await
        .expect("lookup should succeed")
        .expect("doctor should exist");

    assert_eq!(doctor.id, doctor_id);
    assert_eq!(doctor.user_id, user_id);
    assert_eq!(doctor.first_name, "Greg");
}

#[tokio::test]
async fn get_patient_returns_none_when_absent() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/patients"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;

    let service = service_for(&server);
    let patient = service
        .get_patient(Uuid::new_v4(), Some("token"))
        .await
        .expect("lookup should succeed");

    assert!(patient.is_none());
}

#[tokio::test]
async fn link_patches_both_sides_when_unlinked() {
    let server = MockServer::start().await;
    let doctor_id = Uuid::new_v4();
    let patient_id = Uuid::new_v4();

    Mock::given(method("PATCH"))
        .and(path("/rest/v1/patients"))
        .and(query_param("id", format!("eq.{}", patient_id)))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("PATCH"))
        .and(path("/rest/v1/doctors"))
        .and(query_param("id", format!("eq.{}", doctor_id)))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let doctor = DoctorProfile {
        id: doctor_id,
        user_id: Uuid::new_v4(),
        first_name: "Greg".into(),
        last_name: "House".into(),
        specialty: None,
        assigned_patient_ids: vec![],
    };
    let patient = PatientProfile {
        id: patient_id,
        user_id: Uuid::new_v4(),
        first_name: "John".into(),
        last_name: "Doe".into(),
        assigned_doctor_ids: vec![],
    };

    let service = service_for(&server);
    service
        .link_doctor_patient(&doctor, &patient, Some("token"))
        .await
        .expect("linking should succeed");
}

#[tokio::test]
async fn link_is_idempotent_when_already_linked() {
    let server = MockServer::start().await;
    let doctor_id = Uuid::new_v4();
    let patient_id = Uuid::new_v4();

    // Already linked on both sides: no PATCH traffic at all.
    Mock::given(method("PATCH"))
        .respond_with(ResponseTemplate::new(204))
        .expect(0)
        .mount(&server)
        .await;

    let doctor = DoctorProfile {
        id: doctor_id,
        user_id: Uuid::new_v4(),
        first_name: "Greg".into(),
        last_name: "House".into(),
        specialty: None,
        assigned_patient_ids: vec![patient_id],
    };
    let patient = PatientProfile {
        id: patient_id,
        user_id: Uuid::new_v4(),
        first_name: "John".into(),
        last_name: "Doe".into(),
        assigned_doctor_ids: vec![doctor_id],
    };

    let service = service_for(&server);
    service
        .link_doctor_patient(&doctor, &patient, Some("token"))
        .await
        .expect("no-op linking should succeed");
}
