//! Catalog CRUD integration tests: clients, projects, products, suppliers,
//! inventory, and branches.

mod common;

use common::{seed_client, seed_product, seed_project, TestApp};
use serde_json::json;

#[tokio::test]
#[ignore] // Requires PostgreSQL
async fn client_crud_round_trip() {
    let app = TestApp::spawn().await.expect("Failed to spawn test app");
    app.cleanup().await.expect("Failed to cleanup");
    let client = app.client();

    let response = client
        .post(format!("{}/clientes", app.address))
        .json(&json!({ "name": "Materiales del Sur", "address": "Calle 5", "discount": "10.00" }))
        .send()
        .await
        .expect("Failed to execute request");
    assert_eq!(response.status(), 201);
    let created: serde_json::Value = response.json().await.unwrap();
    let id = created["id"].as_i64().unwrap();
    assert_eq!(created["name"], "Materiales del Sur");
    assert!(created["project"].is_null());

    let updated: serde_json::Value = client
        .put(format!("{}/clientes/{}", app.address, id))
        .json(&json!({ "name": "Materiales del Sur SA", "address": "Calle 5" }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(updated["name"], "Materiales del Sur SA");

    let response = client
        .delete(format!("{}/clientes/{}", app.address, id))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 204);

    let missing = client
        .get(format!("{}/clientes/{}", app.address, id))
        .send()
        .await
        .unwrap();
    assert_eq!(missing.status(), 404);
}

#[tokio::test]
#[ignore] // Requires PostgreSQL
async fn client_project_field_is_derived_from_principal_project() {
    let app = TestApp::spawn().await.expect("Failed to spawn test app");
    app.cleanup().await.expect("Failed to cleanup");

    let client_id = seed_client(&app.pool, "Cliente Proyectos").await.unwrap();
    seed_project(&app.pool, client_id, "Primero").await.unwrap();
    seed_project(&app.pool, client_id, "Segundo").await.unwrap();

    let fetched: serde_json::Value = app
        .client()
        .get(format!("{}/clientes/{}", app.address, client_id))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    // Lowest project id wins.
    assert_eq!(fetched["project"], "Primero");
}

#[tokio::test]
#[ignore] // Requires PostgreSQL
async fn empty_client_name_fails_validation() {
    let app = TestApp::spawn().await.expect("Failed to spawn test app");
    app.cleanup().await.expect("Failed to cleanup");

    let response = app
        .client()
        .post(format!("{}/clientes", app.address))
        .json(&json!({ "name": "" }))
        .send()
        .await
        .expect("Failed to execute request");
    assert_eq!(response.status(), 422);
}

#[tokio::test]
#[ignore] // Requires PostgreSQL
async fn project_reassignment_moves_client() {
    let app = TestApp::spawn().await.expect("Failed to spawn test app");
    app.cleanup().await.expect("Failed to cleanup");

    let first = seed_client(&app.pool, "Dueño Original").await.unwrap();
    let second = seed_client(&app.pool, "Dueño Nuevo").await.unwrap();
    let project_id = seed_project(&app.pool, first, "Obra Compartida")
        .await
        .unwrap();

    let response = app
        .client()
        .put(format!("{}/proyectos/{}/reasignar", app.address, project_id))
        .json(&json!({ "client_id": second }))
        .send()
        .await
        .expect("Failed to execute request");
    assert_eq!(response.status(), 200);

    let project: serde_json::Value = response.json().await.unwrap();
    assert_eq!(project["client_id"].as_i64().unwrap(), second);
    assert_eq!(project["client_name"], "Dueño Nuevo");

    // It now lists under the new client.
    let listed: serde_json::Value = app
        .client()
        .get(format!("{}/clientes/{}/proyectos", app.address, second))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(listed.as_array().unwrap().len(), 1);
}

#[tokio::test]
#[ignore] // Requires PostgreSQL
async fn duplicate_product_code_is_a_conflict() {
    let app = TestApp::spawn().await.expect("Failed to spawn test app");
    app.cleanup().await.expect("Failed to cleanup");

    seed_product(&app.pool, "DUP-001", "Primero").await.unwrap();

    let response = app
        .client()
        .post(format!("{}/productos", app.address))
        .json(&json!({ "code": "DUP-001", "name": "Segundo" }))
        .send()
        .await
        .expect("Failed to execute request");
    assert_eq!(response.status(), 409);
}

#[tokio::test]
#[ignore] // Requires PostgreSQL
async fn product_joins_supplier_name() {
    let app = TestApp::spawn().await.expect("Failed to spawn test app");
    app.cleanup().await.expect("Failed to cleanup");
    let client = app.client();

    let supplier: serde_json::Value = client
        .post(format!("{}/proveedores", app.address))
        .json(&json!({ "name": "Cerámicas Lux", "email": "ventas@lux.mx" }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let supplier_id = supplier["id"].as_i64().unwrap();

    let product: serde_json::Value = client
        .post(format!("{}/productos", app.address))
        .json(&json!({
            "code": "LUX-100",
            "name": "Azulejo Lux",
            "supplier_id": supplier_id,
            "is_external": true
        }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert_eq!(product["supplier_name"], "Cerámicas Lux");
    assert_eq!(product["is_external"], true);
}

#[tokio::test]
#[ignore] // Requires PostgreSQL
async fn inventory_tracks_product_and_rejects_unknown() {
    let app = TestApp::spawn().await.expect("Failed to spawn test app");
    app.cleanup().await.expect("Failed to cleanup");
    let client = app.client();

    let product_id = seed_product(&app.pool, "INV-001", "Piso Gris").await.unwrap();

    let item: serde_json::Value = client
        .post(format!("{}/inventario", app.address))
        .json(&json!({ "product_id": product_id, "quantity": 40, "location": "Bodega 2" }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(item["product_name"], "Piso Gris");
    assert_eq!(item["quantity"], 40);

    let response = client
        .post(format!("{}/inventario", app.address))
        .json(&json!({ "product_id": 999_999, "quantity": 1 }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 404);
}

#[tokio::test]
#[ignore] // Requires PostgreSQL
async fn branch_crud_round_trip() {
    let app = TestApp::spawn().await.expect("Failed to spawn test app");
    app.cleanup().await.expect("Failed to cleanup");
    let client = app.client();

    let branch: serde_json::Value = client
        .post(format!("{}/sucursales", app.address))
        .json(&json!({ "name": "Sucursal Centro", "phone": "555-0100" }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let id = branch["id"].as_i64().unwrap();

    let listed: serde_json::Value = client
        .get(format!("{}/sucursales", app.address))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(listed.as_array().unwrap().len(), 1);

    let response = client
        .delete(format!("{}/sucursales/{}", app.address, id))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 204);
}

#[tokio::test]
#[ignore] // Requires PostgreSQL
async fn health_and_metrics_endpoints_respond() {
    let app = TestApp::spawn().await.expect("Failed to spawn test app");
    let client = app.client();

    let health = client
        .get(format!("{}/health", app.address))
        .send()
        .await
        .unwrap();
    assert_eq!(health.status(), 200);

    let ready = client
        .get(format!("{}/ready", app.address))
        .send()
        .await
        .unwrap();
    assert_eq!(ready.status(), 200);

    let metrics = client
        .get(format!("{}/metrics", app.address))
        .send()
        .await
        .unwrap();
    assert_eq!(metrics.status(), 200);
}
