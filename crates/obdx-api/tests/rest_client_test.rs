// Integration tests for `RestClient` using wiremock.
#![allow(clippy::unwrap_used)]

use chrono::{TimeZone, Utc};
use pretty_assertions::assert_eq;
use secrecy::SecretString;
use serde_json::json;
use uuid::Uuid;
use wiremock::matchers::{body_partial_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use obdx_api::models::{NewReservationRow, SlotPatch};
use obdx_api::rest::SlotQuery;
use obdx_api::{Error, RestClient, TransportConfig};

// ── Helpers ─────────────────────────────────────────────────────────

async fn setup() -> (MockServer, RestClient) {
    let server = MockServer::start().await;
    let client = RestClient::from_reqwest(&server.uri(), reqwest::Client::new()).unwrap();
    (server, client)
}

fn slot_json(id: Uuid, statut: &str, reservation_id: Option<Uuid>) -> serde_json::Value {
    json!({
        "id": id,
        "date_debut": "2025-06-10T09:00:00+00:00",
        "date_fin": "2025-06-10T10:00:00+00:00",
        "statut": statut,
        "reservation_id": reservation_id,
        "notes": null,
        "created_at": "2025-06-01T08:00:00+00:00",
        "updated_at": "2025-06-01T08:00:00+00:00"
    })
}

fn new_reservation(id: Uuid, slot_id: Uuid) -> NewReservationRow {
    NewReservationRow {
        id,
        nom: "Martin".into(),
        prenom: "Claire".into(),
        email: "claire@example.fr".into(),
        telephone: "0600000000".into(),
        adresse: "1 rue de la Paix".into(),
        ville: "Lyon".into(),
        code_postal: "69001".into(),
        marque_vehicule: "Renault".into(),
        modele_vehicule: "Clio".into(),
        annee_vehicule: Some(2018),
        numero_vin: None,
        type_prestation: "essentiel".into(),
        prix: "99.00".into(),
        notes: None,
        statut: "nouvelle".into(),
        date_heure: Utc.with_ymd_and_hms(2025, 6, 10, 9, 0, 0).unwrap(),
        date_fin: Utc.with_ymd_and_hms(2025, 6, 10, 10, 0, 0).unwrap(),
        disponibilite_id: slot_id,
        idempotency_key: "key-1".into(),
    }
}

// ── Auth headers ────────────────────────────────────────────────────

#[tokio::test]
async fn test_api_key_sent_as_apikey_and_bearer() {
    let server = MockServer::start().await;
    let key = SecretString::from("anon-key".to_owned());
    let client =
        RestClient::from_api_key(&server.uri(), &key, &TransportConfig::default()).unwrap();

    Mock::given(method("GET"))
        .and(path("/rest/v1/disponibilites"))
        .and(header("apikey", "anon-key"))
        .and(header("authorization", "Bearer anon-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(1)
        .mount(&server)
        .await;

    let rows = client.list_slots(&SlotQuery::default()).await.unwrap();
    assert!(rows.is_empty());
}

// ── Reads ───────────────────────────────────────────────────────────

#[tokio::test]
async fn test_list_slots_with_filters() {
    let (server, client) = setup().await;
    let id = Uuid::new_v4();

    Mock::given(method("GET"))
        .and(path("/rest/v1/disponibilites"))
        .and(query_param("order", "date_debut.asc,id.asc"))
        .and(query_param("statut", "eq.disponible"))
        .and(query_param("date_fin", "gt.2025-06-10T00:00:00Z"))
        .and(query_param("date_debut", "lt.2025-06-11T00:00:00Z"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!([slot_json(id, "disponible", None)])),
        )
        .mount(&server)
        .await;

    let query = SlotQuery {
        statut: Some("disponible".into()),
        from: Some(Utc.with_ymd_and_hms(2025, 6, 10, 0, 0, 0).unwrap()),
        to: Some(Utc.with_ymd_and_hms(2025, 6, 11, 0, 0, 0).unwrap()),
    };
    let rows = client.list_slots(&query).await.unwrap();

    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].id, id);
    assert_eq!(rows[0].statut, "disponible");
    assert_eq!(
        rows[0].date_debut,
        Utc.with_ymd_and_hms(2025, 6, 10, 9, 0, 0).unwrap()
    );
}

#[tokio::test]
async fn test_range_bounds_keep_subsecond_precision() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/disponibilites"))
        .and(query_param("date_fin", "gt.2025-06-10T09:30:00.250Z"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(1)
        .mount(&server)
        .await;

    let from = Utc.with_ymd_and_hms(2025, 6, 10, 9, 30, 0).unwrap()
        + chrono::Duration::milliseconds(250);
    let query = SlotQuery {
        from: Some(from),
        ..SlotQuery::default()
    };
    assert!(client.list_slots(&query).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_get_slot_missing_returns_none() {
    let (server, client) = setup().await;
    let id = Uuid::new_v4();

    Mock::given(method("GET"))
        .and(path("/rest/v1/disponibilites"))
        .and(query_param("id", format!("eq.{id}")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;

    assert!(client.get_slot(id).await.unwrap().is_none());
}

// ── Conditional writes ──────────────────────────────────────────────

#[tokio::test]
async fn test_update_slot_if_sends_precondition_filters() {
    let (server, client) = setup().await;
    let id = Uuid::new_v4();
    let rid = Uuid::new_v4();

    Mock::given(method("PATCH"))
        .and(path("/rest/v1/disponibilites"))
        .and(query_param("id", format!("eq.{id}")))
        .and(query_param("statut", "eq.disponible"))
        .and(header("prefer", "return=representation"))
        .and(body_partial_json(json!({ "statut": "reserve", "reservation_id": rid })))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!([slot_json(id, "reserve", Some(rid))])),
        )
        .expect(1)
        .mount(&server)
        .await;

    let patch = SlotPatch {
        statut: Some("reserve".into()),
        reservation_id: Some(Some(rid)),
        ..SlotPatch::default()
    };
    let row = client
        .update_slot_if(id, "disponible", None, &patch)
        .await
        .unwrap()
        .unwrap();

    assert_eq!(row.statut, "reserve");
    assert_eq!(row.reservation_id, Some(rid));
}

#[tokio::test]
async fn test_update_slot_if_no_match_returns_none() {
    let (server, client) = setup().await;
    let id = Uuid::new_v4();
    let rid = Uuid::new_v4();

    Mock::given(method("PATCH"))
        .and(path("/rest/v1/disponibilites"))
        .and(query_param("reservation_id", format!("eq.{rid}")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;

    let patch = SlotPatch {
        statut: Some("disponible".into()),
        reservation_id: Some(None),
        ..SlotPatch::default()
    };
    let row = client
        .update_slot_if(id, "reserve", Some(rid), &patch)
        .await
        .unwrap();
    assert!(row.is_none());
}

#[tokio::test]
async fn test_window_edit_skips_reserved_rows() {
    let (server, client) = setup().await;
    let id = Uuid::new_v4();

    Mock::given(method("PATCH"))
        .and(path("/rest/v1/disponibilites"))
        .and(query_param("id", format!("eq.{id}")))
        .and(query_param("statut", "neq.reserve"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(1)
        .mount(&server)
        .await;

    let patch = SlotPatch {
        date_debut: Some(Utc.with_ymd_and_hms(2025, 6, 10, 15, 0, 0).unwrap()),
        date_fin: Some(Utc.with_ymd_and_hms(2025, 6, 10, 16, 0, 0).unwrap()),
        ..SlotPatch::default()
    };
    let row = client.update_slot_unless(id, "reserve", &patch).await.unwrap();
    assert!(row.is_none());
}

#[tokio::test]
async fn test_delete_slot_unless_reserved() {
    let (server, client) = setup().await;
    let id = Uuid::new_v4();

    Mock::given(method("DELETE"))
        .and(path("/rest/v1/disponibilites"))
        .and(query_param("statut", "neq.reserve"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!([slot_json(id, "bloque", None)])),
        )
        .mount(&server)
        .await;

    let row = client.delete_slot_unless(id, "reserve").await.unwrap();
    assert_eq!(row.unwrap().statut, "bloque");
}

// ── Inserts ─────────────────────────────────────────────────────────

#[tokio::test]
async fn test_insert_reservation_conflict() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/reservations"))
        .respond_with(ResponseTemplate::new(409).set_body_json(json!({
            "code": "23505",
            "message": "duplicate key value violates unique constraint \"reservations_pkey\"",
            "details": null,
            "hint": null
        })))
        .mount(&server)
        .await;

    let err = client
        .insert_reservation(&new_reservation(Uuid::new_v4(), Uuid::new_v4()))
        .await
        .unwrap_err();

    assert!(err.is_conflict(), "expected conflict, got {err:?}");
    assert_eq!(err.api_error_code(), Some("23505"));
}

#[tokio::test]
async fn test_insert_reservation_returns_representation() {
    let (server, client) = setup().await;
    let id = Uuid::new_v4();
    let slot_id = Uuid::new_v4();

    let mut body = serde_json::to_value(new_reservation(id, slot_id)).unwrap();
    body["created_at"] = json!("2025-06-01T08:00:00+00:00");

    Mock::given(method("POST"))
        .and(path("/rest/v1/reservations"))
        .and(body_partial_json(json!({ "id": id, "disponibilite_id": slot_id })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([body])))
        .mount(&server)
        .await;

    let row = client
        .insert_reservation(&new_reservation(id, slot_id))
        .await
        .unwrap();
    assert_eq!(row.id, id);
    assert_eq!(row.disponibilite_id, Some(slot_id));
    assert_eq!(row.prix, "99.00");
}

#[tokio::test]
async fn test_numeric_prix_column_reads_as_text() {
    let (server, client) = setup().await;
    let whole = Uuid::new_v4();
    let fractional = Uuid::new_v4();

    let mut a = serde_json::to_value(new_reservation(whole, Uuid::new_v4())).unwrap();
    a["prix"] = json!(99);
    let mut b = serde_json::to_value(new_reservation(fractional, Uuid::new_v4())).unwrap();
    b["prix"] = json!(129.5);

    Mock::given(method("GET"))
        .and(path("/rest/v1/reservations"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([a, b])))
        .mount(&server)
        .await;

    let rows = client.list_reservations().await.unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].prix, "99");
    assert_eq!(rows[1].prix, "129.5");
}

// ── Error mapping ───────────────────────────────────────────────────

#[tokio::test]
async fn test_unauthorized_maps_to_authentication() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/demandes_sav"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "message": "Invalid API key"
        })))
        .mount(&server)
        .await;

    let err = client.list_tickets().await.unwrap_err();
    assert!(matches!(err, Error::Authentication { ref message } if message == "Invalid API key"));
}

#[tokio::test]
async fn test_server_error_is_transient() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/reservations"))
        .respond_with(ResponseTemplate::new(503).set_body_string("upstream unavailable"))
        .mount(&server)
        .await;

    let err = client.list_reservations().await.unwrap_err();
    assert!(err.is_transient());
    assert!(matches!(err, Error::Rest { status: 503, .. }));
}

#[tokio::test]
async fn test_malformed_body_keeps_raw_payload() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/disponibilites"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
        .mount(&server)
        .await;

    let err = client.list_slots(&SlotQuery::default()).await.unwrap_err();
    match err {
        Error::Deserialization { body, .. } => assert_eq!(body, "<html>oops</html>"),
        other => panic!("expected deserialization error, got {other:?}"),
    }
}
