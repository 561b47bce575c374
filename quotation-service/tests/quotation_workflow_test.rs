//! Quotation workflow integration tests: create, update, convert, delete,
//! and the PDF endpoints.

mod common;

use common::{seed_client, seed_product, seed_project, TestApp};
use serde_json::json;

#[tokio::test]
#[ignore] // Requires PostgreSQL (and Liberation fonts for PDF rendering)
async fn create_quotation_returns_full_aggregate() {
    let app = TestApp::spawn().await.expect("Failed to spawn test app");
    app.cleanup().await.expect("Failed to cleanup");

    let client_id = seed_client(&app.pool, "Constructora Norte").await.unwrap();
    let project_id = seed_project(&app.pool, client_id, "Torre A").await.unwrap();
    let product_id = seed_product(&app.pool, "PM-001", "Porcelanato Marfil")
        .await
        .unwrap();

    let body = json!({
        "client_id": client_id,
        "project_id": project_id,
        "details": [
            { "product_id": product_id, "quantity": "4", "unit_price": "250.00" },
            { "product_id": product_id, "quantity": "2", "unit_price": "100.50" }
        ]
    });

    let response = app
        .client()
        .post(format!("{}/cotizaciones", app.address))
        .header("X-User-ID", "7")
        .json(&body)
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status(), 201);

    let quotation: serde_json::Value = response.json().await.unwrap();
    // Snapshot of the client name, computed total, and the pending association.
    assert_eq!(quotation["client_name"], "Constructora Norte");
    assert_eq!(quotation["total"], "1201.00");
    assert_eq!(quotation["user_id"], 7);
    assert_eq!(quotation["project_name"], "Torre A");
    assert_eq!(quotation["association"]["status"], "pending");
    assert_eq!(quotation["details"].as_array().unwrap().len(), 2);
    assert_eq!(quotation["details"][0]["product_name"], "Porcelanato Marfil");
}

#[tokio::test]
#[ignore] // Requires PostgreSQL
async fn create_quotation_without_line_items_is_rejected() {
    let app = TestApp::spawn().await.expect("Failed to spawn test app");
    app.cleanup().await.expect("Failed to cleanup");

    let client_id = seed_client(&app.pool, "Cliente Vacío").await.unwrap();

    let response = app
        .client()
        .post(format!("{}/cotizaciones", app.address))
        .header("X-User-ID", "1")
        .json(&json!({ "client_id": client_id, "details": [] }))
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status(), 400);
}

#[tokio::test]
#[ignore] // Requires PostgreSQL
async fn create_quotation_for_unknown_client_is_not_found() {
    let app = TestApp::spawn().await.expect("Failed to spawn test app");
    app.cleanup().await.expect("Failed to cleanup");

    let product_id = seed_product(&app.pool, "PM-404", "Producto Suelto")
        .await
        .unwrap();

    let response = app
        .client()
        .post(format!("{}/cotizaciones", app.address))
        .header("X-User-ID", "1")
        .json(&json!({
            "client_id": 999_999,
            "details": [{ "product_id": product_id, "quantity": "1", "unit_price": "10.00" }]
        }))
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status(), 404);

    // Nothing was persisted.
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM quotations")
        .fetch_one(&app.pool)
        .await
        .unwrap();
    assert_eq!(count, 0);
}

#[tokio::test]
#[ignore] // Requires PostgreSQL
async fn create_quotation_without_user_header_is_unauthorized() {
    let app = TestApp::spawn().await.expect("Failed to spawn test app");
    app.cleanup().await.expect("Failed to cleanup");

    let response = app
        .client()
        .post(format!("{}/cotizaciones", app.address))
        .json(&json!({ "client_id": 1, "details": [] }))
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status(), 401);
}

#[tokio::test]
#[ignore] // Requires PostgreSQL
async fn inconsistent_margin_fields_are_rejected() {
    let app = TestApp::spawn().await.expect("Failed to spawn test app");
    app.cleanup().await.expect("Failed to cleanup");

    let client_id = seed_client(&app.pool, "Cliente Margen").await.unwrap();
    let product_id = seed_product(&app.pool, "PM-MARGEN", "Producto Margen")
        .await
        .unwrap();

    // 15% of (10.00 * 2) is 3.00, not 9.99.
    let response = app
        .client()
        .post(format!("{}/cotizaciones", app.address))
        .header("X-User-ID", "1")
        .json(&json!({
            "client_id": client_id,
            "details": [{
                "product_id": product_id,
                "quantity": "2",
                "unit_price": "10.00",
                "margin_percent": "15",
                "margin_amount": "9.99"
            }]
        }))
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status(), 400);
}

#[tokio::test]
#[ignore] // Requires PostgreSQL (and Liberation fonts for PDF rendering)
async fn update_replaces_line_items_and_recomputes_total() {
    let app = TestApp::spawn().await.expect("Failed to spawn test app");
    app.cleanup().await.expect("Failed to cleanup");

    let client_id = seed_client(&app.pool, "Cliente Update").await.unwrap();
    let product_id = seed_product(&app.pool, "PM-UPD", "Producto Update")
        .await
        .unwrap();
    let client = app.client();

    let created: serde_json::Value = client
        .post(format!("{}/cotizaciones", app.address))
        .header("X-User-ID", "1")
        .json(&json!({
            "client_id": client_id,
            "details": [{ "product_id": product_id, "quantity": "1", "unit_price": "100.00" }]
        }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let quotation_id = created["id"].as_i64().unwrap();
    assert_eq!(created["total"], "100.00");

    let response = client
        .put(format!("{}/cotizaciones/{}", app.address, quotation_id))
        .header("X-User-ID", "1")
        .json(&json!({
            "details": [
                { "product_id": product_id, "quantity": "3", "unit_price": "50.00" }
            ]
        }))
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status(), 200);
    let updated: serde_json::Value = response.json().await.unwrap();
    assert_eq!(updated["total"], "150.00");
    assert_eq!(updated["details"].as_array().unwrap().len(), 1);
}

#[tokio::test]
#[ignore] // Requires PostgreSQL (and Liberation fonts for PDF rendering)
async fn changing_client_refreshes_snapshot_and_clears_project() {
    let app = TestApp::spawn().await.expect("Failed to spawn test app");
    app.cleanup().await.expect("Failed to cleanup");

    let first_client = seed_client(&app.pool, "Cliente Original").await.unwrap();
    let project_id = seed_project(&app.pool, first_client, "Proyecto Original")
        .await
        .unwrap();
    let second_client = seed_client(&app.pool, "Cliente Nuevo").await.unwrap();
    let product_id = seed_product(&app.pool, "PM-SNAP", "Producto Snapshot")
        .await
        .unwrap();
    let client = app.client();

    let created: serde_json::Value = client
        .post(format!("{}/cotizaciones", app.address))
        .header("X-User-ID", "1")
        .json(&json!({
            "client_id": first_client,
            "project_id": project_id,
            "details": [{ "product_id": product_id, "quantity": "1", "unit_price": "10.00" }]
        }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let quotation_id = created["id"].as_i64().unwrap();

    let updated: serde_json::Value = client
        .put(format!("{}/cotizaciones/{}", app.address, quotation_id))
        .header("X-User-ID", "1")
        .json(&json!({ "client_id": second_client }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert_eq!(updated["client_name"], "Cliente Nuevo");
    assert!(updated["project_id"].is_null());
    assert!(updated["project_name"].is_null());
}

#[tokio::test]
#[ignore] // Requires PostgreSQL (and Liberation fonts for PDF rendering)
async fn convert_creates_sales_order_once() {
    let app = TestApp::spawn().await.expect("Failed to spawn test app");
    app.cleanup().await.expect("Failed to cleanup");

    let client_id = seed_client(&app.pool, "Cliente Convertir").await.unwrap();
    let product_id = seed_product(&app.pool, "PM-CONV", "Producto Convertir")
        .await
        .unwrap();
    let client = app.client();

    let created: serde_json::Value = client
        .post(format!("{}/cotizaciones", app.address))
        .header("X-User-ID", "3")
        .json(&json!({
            "client_id": client_id,
            "details": [{ "product_id": product_id, "quantity": "2", "unit_price": "80.00" }]
        }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let quotation_id = created["id"].as_i64().unwrap();

    let response = client
        .post(format!(
            "{}/cotizaciones/{}/convertir",
            app.address, quotation_id
        ))
        .header("X-User-ID", "3")
        .send()
        .await
        .expect("Failed to execute request");
    assert_eq!(response.status(), 201);

    let order: serde_json::Value = response.json().await.unwrap();
    assert_eq!(order["quotation_id"].as_i64().unwrap(), quotation_id);
    assert_eq!(order["client_name"], "Cliente Convertir");
    assert_eq!(order["total"], "160.00");
    assert_eq!(order["status"], "fulfilling");
    assert_eq!(order["details"].as_array().unwrap().len(), 1);

    // A second conversion is rejected.
    let second = client
        .post(format!(
            "{}/cotizaciones/{}/convertir",
            app.address, quotation_id
        ))
        .header("X-User-ID", "3")
        .send()
        .await
        .unwrap();
    assert_eq!(second.status(), 400);

    // Converted quotations no longer show in the open list.
    let open: serde_json::Value = client
        .get(format!("{}/cotizaciones", app.address))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(open.as_array().unwrap().is_empty());

    // But the quotation itself is still readable.
    let by_id = client
        .get(format!("{}/cotizaciones/{}", app.address, quotation_id))
        .send()
        .await
        .unwrap();
    assert_eq!(by_id.status(), 200);
}

#[tokio::test]
#[ignore] // Requires PostgreSQL (and Liberation fonts for PDF rendering)
async fn cancel_is_an_alias_for_delete() {
    let app = TestApp::spawn().await.expect("Failed to spawn test app");
    app.cleanup().await.expect("Failed to cleanup");

    let client_id = seed_client(&app.pool, "Cliente Cancelar").await.unwrap();
    let product_id = seed_product(&app.pool, "PM-CANC", "Producto Cancelar")
        .await
        .unwrap();
    let client = app.client();

    let created: serde_json::Value = client
        .post(format!("{}/cotizaciones", app.address))
        .header("X-User-ID", "1")
        .json(&json!({
            "client_id": client_id,
            "details": [{ "product_id": product_id, "quantity": "1", "unit_price": "10.00" }]
        }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let quotation_id = created["id"].as_i64().unwrap();

    let response = client
        .put(format!("{}/cotizaciones/{}/cancel", app.address, quotation_id))
        .header("X-User-ID", "1")
        .send()
        .await
        .expect("Failed to execute request");
    assert_eq!(response.status(), 204);

    let after = client
        .get(format!("{}/cotizaciones/{}", app.address, quotation_id))
        .send()
        .await
        .unwrap();
    assert_eq!(after.status(), 404);
}

#[tokio::test]
#[ignore] // Requires PostgreSQL
async fn mutating_routes_require_user_header() {
    let app = TestApp::spawn().await.expect("Failed to spawn test app");
    app.cleanup().await.expect("Failed to cleanup");

    let client = app.client();

    let update = client
        .put(format!("{}/cotizaciones/1", app.address))
        .json(&json!({}))
        .send()
        .await
        .unwrap();
    assert_eq!(update.status(), 401);

    let delete = client
        .delete(format!("{}/cotizaciones/1", app.address))
        .send()
        .await
        .unwrap();
    assert_eq!(delete.status(), 401);

    let cancel = client
        .put(format!("{}/cotizaciones/1/cancel", app.address))
        .send()
        .await
        .unwrap();
    assert_eq!(cancel.status(), 401);

    let convert = client
        .post(format!("{}/cotizaciones/1/convertir", app.address))
        .send()
        .await
        .unwrap();
    assert_eq!(convert.status(), 401);
}

#[tokio::test]
#[ignore] // Requires PostgreSQL (and Liberation fonts for PDF rendering)
async fn update_with_empty_line_list_persists_nothing() {
    let app = TestApp::spawn().await.expect("Failed to spawn test app");
    app.cleanup().await.expect("Failed to cleanup");

    let client_id = seed_client(&app.pool, "Cliente Líneas").await.unwrap();
    let product_id = seed_product(&app.pool, "PM-EMPTY", "Producto Líneas")
        .await
        .unwrap();
    let client = app.client();

    let created: serde_json::Value = client
        .post(format!("{}/cotizaciones", app.address))
        .header("X-User-ID", "1")
        .json(&json!({
            "client_id": client_id,
            "details": [{ "product_id": product_id, "quantity": "1", "unit_price": "100.00" }]
        }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let quotation_id = created["id"].as_i64().unwrap();

    let response = client
        .put(format!("{}/cotizaciones/{}", app.address, quotation_id))
        .header("X-User-ID", "1")
        .json(&json!({ "details": [] }))
        .send()
        .await
        .expect("Failed to execute request");
    assert_eq!(response.status(), 400);

    // The previous lines and total are untouched.
    let after: serde_json::Value = client
        .get(format!("{}/cotizaciones/{}", app.address, quotation_id))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(after["total"], "100.00");
    assert_eq!(after["details"].as_array().unwrap().len(), 1);
}

#[tokio::test]
#[ignore] // Requires PostgreSQL (and Liberation fonts for PDF rendering)
async fn explicit_total_overrides_line_sum() {
    let app = TestApp::spawn().await.expect("Failed to spawn test app");
    app.cleanup().await.expect("Failed to cleanup");

    let client_id = seed_client(&app.pool, "Cliente Total").await.unwrap();
    let product_id = seed_product(&app.pool, "PM-TOTAL", "Producto Total")
        .await
        .unwrap();
    let client = app.client();

    // On create the caller's total wins over the 10.00 line sum.
    let created: serde_json::Value = client
        .post(format!("{}/cotizaciones", app.address))
        .header("X-User-ID", "1")
        .json(&json!({
            "client_id": client_id,
            "total": "999.99",
            "details": [{ "product_id": product_id, "quantity": "1", "unit_price": "10.00" }]
        }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(created["total"], "999.99");
    let quotation_id = created["id"].as_i64().unwrap();

    // On update it wins over the recomputed 150.00 sum of the new lines.
    let updated: serde_json::Value = client
        .put(format!("{}/cotizaciones/{}", app.address, quotation_id))
        .header("X-User-ID", "1")
        .json(&json!({
            "total": "500.00",
            "details": [{ "product_id": product_id, "quantity": "3", "unit_price": "50.00" }]
        }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(updated["total"], "500.00");
}

#[tokio::test]
#[ignore] // Requires PostgreSQL (and Liberation fonts for PDF rendering)
async fn deleting_converted_quotation_is_rejected() {
    let app = TestApp::spawn().await.expect("Failed to spawn test app");
    app.cleanup().await.expect("Failed to cleanup");

    let client_id = seed_client(&app.pool, "Cliente Surtido").await.unwrap();
    let product_id = seed_product(&app.pool, "PM-SURT", "Producto Surtido")
        .await
        .unwrap();
    let client = app.client();

    let created: serde_json::Value = client
        .post(format!("{}/cotizaciones", app.address))
        .header("X-User-ID", "1")
        .json(&json!({
            "client_id": client_id,
            "details": [{ "product_id": product_id, "quantity": "1", "unit_price": "10.00" }]
        }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let quotation_id = created["id"].as_i64().unwrap();

    let convert = client
        .post(format!(
            "{}/cotizaciones/{}/convertir",
            app.address, quotation_id
        ))
        .header("X-User-ID", "1")
        .send()
        .await
        .unwrap();
    assert_eq!(convert.status(), 201);

    let delete = client
        .delete(format!("{}/cotizaciones/{}", app.address, quotation_id))
        .header("X-User-ID", "1")
        .send()
        .await
        .expect("Failed to execute request");
    assert_eq!(delete.status(), 400);

    // The quotation and its sales order are still there.
    let after = client
        .get(format!("{}/cotizaciones/{}", app.address, quotation_id))
        .send()
        .await
        .unwrap();
    assert_eq!(after.status(), 200);
}

#[tokio::test]
#[ignore] // Requires PostgreSQL
async fn errors_are_counted_in_metrics() {
    let app = TestApp::spawn().await.expect("Failed to spawn test app");
    app.cleanup().await.expect("Failed to cleanup");

    let client = app.client();

    let missing = client
        .get(format!("{}/cotizaciones/999999", app.address))
        .send()
        .await
        .unwrap();
    assert_eq!(missing.status(), 404);

    let metrics = client
        .get(format!("{}/metrics", app.address))
        .send()
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    assert!(metrics.contains("quotation_errors_total"));
    assert!(metrics.contains("error_type=\"not_found\""));
}

#[tokio::test]
#[ignore] // Requires PostgreSQL (and Liberation fonts for PDF rendering)
async fn pdf_endpoints_serve_documents() {
    let app = TestApp::spawn().await.expect("Failed to spawn test app");
    app.cleanup().await.expect("Failed to cleanup");

    let client_id = seed_client(&app.pool, "Cliente PDF").await.unwrap();
    let product_id = seed_product(&app.pool, "PM-PDF", "Producto PDF")
        .await
        .unwrap();
    let client = app.client();

    let created: serde_json::Value = client
        .post(format!("{}/cotizaciones", app.address))
        .header("X-User-ID", "1")
        .json(&json!({
            "client_id": client_id,
            "details": [{ "product_id": product_id, "quantity": "1", "unit_price": "10.00" }]
        }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let quotation_id = created["id"].as_i64().unwrap();

    for path in ["pdf", "nota-remision"] {
        let response = client
            .get(format!(
                "{}/cotizaciones/{}/{}",
                app.address, quotation_id, path
            ))
            .send()
            .await
            .expect("Failed to execute request");
        assert_eq!(response.status(), 200);
        assert_eq!(
            response.headers()["content-type"].to_str().unwrap(),
            "application/pdf"
        );
        let bytes = response.bytes().await.unwrap();
        assert!(bytes.starts_with(b"%PDF"));
    }
}

#[tokio::test]
#[ignore] // Requires PostgreSQL (and Liberation fonts for PDF rendering)
async fn delete_removes_quotation_and_children() {
    let app = TestApp::spawn().await.expect("Failed to spawn test app");
    app.cleanup().await.expect("Failed to cleanup");

    let client_id = seed_client(&app.pool, "Cliente Borrar").await.unwrap();
    let product_id = seed_product(&app.pool, "PM-DEL", "Producto Borrar")
        .await
        .unwrap();
    let client = app.client();

    let created: serde_json::Value = client
        .post(format!("{}/cotizaciones", app.address))
        .header("X-User-ID", "1")
        .json(&json!({
            "client_id": client_id,
            "details": [{ "product_id": product_id, "quantity": "1", "unit_price": "10.00" }]
        }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let quotation_id = created["id"].as_i64().unwrap();

    let response = client
        .delete(format!("{}/cotizaciones/{}", app.address, quotation_id))
        .header("X-User-ID", "1")
        .send()
        .await
        .expect("Failed to execute request");
    assert_eq!(response.status(), 204);

    let details: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM quotation_details WHERE quotation_id = $1")
            .bind(quotation_id)
            .fetch_one(&app.pool)
            .await
            .unwrap();
    assert_eq!(details, 0);

    let associations: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM client_quotations WHERE quotation_id = $1")
            .bind(quotation_id)
            .fetch_one(&app.pool)
            .await
            .unwrap();
    assert_eq!(associations, 0);

    let missing = client
        .get(format!("{}/cotizaciones/{}", app.address, quotation_id))
        .send()
        .await
        .unwrap();
    assert_eq!(missing.status(), 404);
}
