//! Database service for quotation-service.
//!
//! Owns the connection pool and the catalog CRUD (clients, projects,
//! suppliers, products, inventory, branches, sales orders). The quotation
//! workflow itself lives in [`crate::services::quotations`] because it needs
//! transactions spanning several tables.

use crate::models::{
    Branch, Client, ClientQuotation, CreateBranch, CreateClient, CreateInventoryItem,
    CreateProduct, CreateProject, CreateSupplier, InventoryItem, Project, Product, SalesOrder,
    SalesOrderDetail, SalesOrderResponse, Supplier, UpdateInventoryItem, UpdateProduct,
    UpdateProject,
};
use crate::services::metrics::DB_QUERY_DURATION;
use service_core::error::AppError;
use sqlx::postgres::{PgPool, PgPoolOptions};
use std::time::Duration;
use tracing::{info, instrument};

const CLIENT_COLUMNS: &str = r#"
    c.id, c.name, c.address, c.discount, c.created_utc,
    (SELECT p.name FROM projects p WHERE p.client_id = c.id ORDER BY p.id LIMIT 1) AS project
"#;

const PRODUCT_COLUMNS: &str = r#"
    p.id, p.code, p.name, p.format, p.sale_unit, p.pieces_per_box,
    p.piece_weight_kg, p.box_weight_kg, p.m2_per_box,
    p.price_box_with_vat, p.price_box_without_vat,
    p.price_piece_with_vat, p.price_piece_without_vat,
    p.price_m2_with_vat, p.price_m2_without_vat,
    p.color, p.material, p.is_external, p.supplier_id, p.image_url,
    s.name AS supplier_name, p.updated_utc
"#;

/// Database connection pool wrapper.
#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    /// Create a new database connection pool.
    #[instrument(skip(database_url), fields(service = "quotation-service"))]
    pub async fn new(
        database_url: &str,
        max_connections: u32,
        min_connections: u32,
    ) -> Result<Self, AppError> {
        info!(
            max_connections = max_connections,
            min_connections = min_connections,
            "Connecting to PostgreSQL"
        );

        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .min_connections(min_connections)
            .acquire_timeout(Duration::from_secs(30))
            .idle_timeout(Duration::from_secs(600))
            .connect(database_url)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to connect: {}", e)))?;

        info!("PostgreSQL connection pool established");

        Ok(Self { pool })
    }

    /// Get a reference to the connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Check database health.
    #[instrument(skip(self))]
    pub async fn health_check(&self) -> Result<(), AppError> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Health check failed: {}", e)))?;
        Ok(())
    }

    /// Run database migrations.
    #[instrument(skip(self))]
    pub async fn run_migrations(&self) -> Result<(), AppError> {
        info!("Running database migrations");
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Migration failed: {}", e)))?;
        info!("Database migrations completed");
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Client Operations
    // -------------------------------------------------------------------------

    /// Create a new client.
    #[instrument(skip(self, input))]
    pub async fn create_client(&self, input: &CreateClient) -> Result<Client, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["create_client"])
            .start_timer();

        let id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO clients (name, address, discount)
            VALUES ($1, $2, $3)
            RETURNING id
            "#,
        )
        .bind(&input.name)
        .bind(&input.address)
        .bind(input.discount)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to create client: {}", e)))?;

        timer.observe_duration();

        info!(client_id = id, name = %input.name, "Client created");

        self.get_client(id)
            .await?
            .ok_or_else(|| AppError::DatabaseError(anyhow::anyhow!("Created client not found")))
    }

    /// Get a client by ID. The `project` field is the name of the client's
    /// principal project, derived at read time.
    #[instrument(skip(self), fields(client_id = client_id))]
    pub async fn get_client(&self, client_id: i64) -> Result<Option<Client>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["get_client"])
            .start_timer();

        let client = sqlx::query_as::<_, Client>(&format!(
            "SELECT {CLIENT_COLUMNS} FROM clients c WHERE c.id = $1"
        ))
        .bind(client_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to get client: {}", e)))?;

        timer.observe_duration();

        Ok(client)
    }

    /// List all clients.
    #[instrument(skip(self))]
    pub async fn list_clients(&self) -> Result<Vec<Client>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["list_clients"])
            .start_timer();

        let clients = sqlx::query_as::<_, Client>(&format!(
            "SELECT {CLIENT_COLUMNS} FROM clients c ORDER BY c.id"
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to list clients: {}", e)))?;

        timer.observe_duration();

        Ok(clients)
    }

    /// Replace a client's stored fields.
    #[instrument(skip(self, input), fields(client_id = client_id))]
    pub async fn update_client(
        &self,
        client_id: i64,
        input: &CreateClient,
    ) -> Result<Option<Client>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["update_client"])
            .start_timer();

        let result = sqlx::query(
            r#"
            UPDATE clients
            SET name = $2, address = $3, discount = $4
            WHERE id = $1
            "#,
        )
        .bind(client_id)
        .bind(&input.name)
        .bind(&input.address)
        .bind(input.discount)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to update client: {}", e)))?;

        timer.observe_duration();

        if result.rows_affected() == 0 {
            return Ok(None);
        }

        info!(client_id = client_id, "Client updated");

        self.get_client(client_id).await
    }

    /// Delete a client. Projects and quotation associations cascade.
    #[instrument(skip(self), fields(client_id = client_id))]
    pub async fn delete_client(&self, client_id: i64) -> Result<bool, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["delete_client"])
            .start_timer();

        let result = sqlx::query("DELETE FROM clients WHERE id = $1")
            .bind(client_id)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                AppError::DatabaseError(anyhow::anyhow!("Failed to delete client: {}", e))
            })?;

        timer.observe_duration();

        let deleted = result.rows_affected() > 0;
        if deleted {
            info!(client_id = client_id, "Client deleted");
        }

        Ok(deleted)
    }

    /// List the quotation associations of a client.
    #[instrument(skip(self), fields(client_id = client_id))]
    pub async fn list_client_quotations(
        &self,
        client_id: i64,
    ) -> Result<Vec<ClientQuotation>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["list_client_quotations"])
            .start_timer();

        let associations = sqlx::query_as::<_, ClientQuotation>(
            r#"
            SELECT id, client_id, quotation_id, status
            FROM client_quotations
            WHERE client_id = $1
            ORDER BY id
            "#,
        )
        .bind(client_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to list client quotations: {}", e))
        })?;

        timer.observe_duration();

        Ok(associations)
    }

    // -------------------------------------------------------------------------
    // Project Operations
    // -------------------------------------------------------------------------

    /// Create a new project under a client.
    #[instrument(skip(self, input), fields(client_id = input.client_id))]
    pub async fn create_project(&self, input: &CreateProject) -> Result<Project, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["create_project"])
            .start_timer();

        if self.get_client(input.client_id).await?.is_none() {
            return Err(AppError::NotFound(anyhow::anyhow!(
                "Client {} not found",
                input.client_id
            )));
        }

        let project = sqlx::query_as::<_, Project>(
            r#"
            WITH inserted AS (
                INSERT INTO projects (client_id, name, description, address)
                VALUES ($1, $2, $3, $4)
                RETURNING id, client_id, name, description, address, created_utc
            )
            SELECT i.id, i.client_id, i.name, i.description, i.address,
                   c.name AS client_name, i.created_utc
            FROM inserted i
            LEFT JOIN clients c ON c.id = i.client_id
            "#,
        )
        .bind(input.client_id)
        .bind(&input.name)
        .bind(&input.description)
        .bind(&input.address)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to create project: {}", e)))?;

        timer.observe_duration();

        info!(project_id = project.id, client_id = input.client_id, "Project created");

        Ok(project)
    }

    /// Get a project by ID.
    #[instrument(skip(self), fields(project_id = project_id))]
    pub async fn get_project(&self, project_id: i64) -> Result<Option<Project>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["get_project"])
            .start_timer();

        let project = sqlx::query_as::<_, Project>(
            r#"
            SELECT p.id, p.client_id, p.name, p.description, p.address,
                   c.name AS client_name, p.created_utc
            FROM projects p
            LEFT JOIN clients c ON c.id = p.client_id
            WHERE p.id = $1
            "#,
        )
        .bind(project_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to get project: {}", e)))?;

        timer.observe_duration();

        Ok(project)
    }

    /// List all projects.
    #[instrument(skip(self))]
    pub async fn list_projects(&self) -> Result<Vec<Project>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["list_projects"])
            .start_timer();

        let projects = sqlx::query_as::<_, Project>(
            r#"
            SELECT p.id, p.client_id, p.name, p.description, p.address,
                   c.name AS client_name, p.created_utc
            FROM projects p
            LEFT JOIN clients c ON c.id = p.client_id
            ORDER BY p.id
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to list projects: {}", e)))?;

        timer.observe_duration();

        Ok(projects)
    }

    /// List the projects of one client.
    #[instrument(skip(self), fields(client_id = client_id))]
    pub async fn list_projects_for_client(
        &self,
        client_id: i64,
    ) -> Result<Vec<Project>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["list_projects_for_client"])
            .start_timer();

        let projects = sqlx::query_as::<_, Project>(
            r#"
            SELECT p.id, p.client_id, p.name, p.description, p.address,
                   c.name AS client_name, p.created_utc
            FROM projects p
            LEFT JOIN clients c ON c.id = p.client_id
            WHERE p.client_id = $1
            ORDER BY p.id
            "#,
        )
        .bind(client_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to list client projects: {}", e))
        })?;

        timer.observe_duration();

        Ok(projects)
    }

    /// Update a project; absent fields stay untouched.
    #[instrument(skip(self, input), fields(project_id = project_id))]
    pub async fn update_project(
        &self,
        project_id: i64,
        input: &UpdateProject,
    ) -> Result<Option<Project>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["update_project"])
            .start_timer();

        if let Some(client_id) = input.client_id {
            if self.get_client(client_id).await?.is_none() {
                return Err(AppError::NotFound(anyhow::anyhow!(
                    "Client {} not found",
                    client_id
                )));
            }
        }

        let result = sqlx::query(
            r#"
            UPDATE projects
            SET client_id = COALESCE($2, client_id),
                name = COALESCE($3, name),
                description = COALESCE($4, description),
                address = COALESCE($5, address)
            WHERE id = $1
            "#,
        )
        .bind(project_id)
        .bind(input.client_id)
        .bind(&input.name)
        .bind(&input.description)
        .bind(&input.address)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to update project: {}", e)))?;

        timer.observe_duration();

        if result.rows_affected() == 0 {
            return Ok(None);
        }

        info!(project_id = project_id, "Project updated");

        self.get_project(project_id).await
    }

    /// Move a project to a different client.
    #[instrument(skip(self), fields(project_id = project_id, client_id = client_id))]
    pub async fn reassign_project(
        &self,
        project_id: i64,
        client_id: i64,
    ) -> Result<Option<Project>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["reassign_project"])
            .start_timer();

        if self.get_client(client_id).await?.is_none() {
            return Err(AppError::NotFound(anyhow::anyhow!(
                "Client {} not found",
                client_id
            )));
        }

        let result = sqlx::query("UPDATE projects SET client_id = $2 WHERE id = $1")
            .bind(project_id)
            .bind(client_id)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                AppError::DatabaseError(anyhow::anyhow!("Failed to reassign project: {}", e))
            })?;

        timer.observe_duration();

        if result.rows_affected() == 0 {
            return Ok(None);
        }

        info!(project_id = project_id, client_id = client_id, "Project reassigned");

        self.get_project(project_id).await
    }

    /// Delete a project.
    #[instrument(skip(self), fields(project_id = project_id))]
    pub async fn delete_project(&self, project_id: i64) -> Result<bool, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["delete_project"])
            .start_timer();

        let result = sqlx::query("DELETE FROM projects WHERE id = $1")
            .bind(project_id)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                AppError::DatabaseError(anyhow::anyhow!("Failed to delete project: {}", e))
            })?;

        timer.observe_duration();

        let deleted = result.rows_affected() > 0;
        if deleted {
            info!(project_id = project_id, "Project deleted");
        }

        Ok(deleted)
    }

    // -------------------------------------------------------------------------
    // Supplier Operations
    // -------------------------------------------------------------------------

    /// Create a new supplier.
    #[instrument(skip(self, input))]
    pub async fn create_supplier(&self, input: &CreateSupplier) -> Result<Supplier, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["create_supplier"])
            .start_timer();

        let supplier = sqlx::query_as::<_, Supplier>(
            r#"
            INSERT INTO suppliers (name, address, phone, email, contact)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, name, address, phone, email, contact
            "#,
        )
        .bind(&input.name)
        .bind(&input.address)
        .bind(&input.phone)
        .bind(&input.email)
        .bind(&input.contact)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to create supplier: {}", e))
        })?;

        timer.observe_duration();

        info!(supplier_id = supplier.id, name = %supplier.name, "Supplier created");

        Ok(supplier)
    }

    /// Get a supplier by ID.
    #[instrument(skip(self), fields(supplier_id = supplier_id))]
    pub async fn get_supplier(&self, supplier_id: i64) -> Result<Option<Supplier>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["get_supplier"])
            .start_timer();

        let supplier = sqlx::query_as::<_, Supplier>(
            "SELECT id, name, address, phone, email, contact FROM suppliers WHERE id = $1",
        )
        .bind(supplier_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to get supplier: {}", e)))?;

        timer.observe_duration();

        Ok(supplier)
    }

    /// List all suppliers.
    #[instrument(skip(self))]
    pub async fn list_suppliers(&self) -> Result<Vec<Supplier>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["list_suppliers"])
            .start_timer();

        let suppliers = sqlx::query_as::<_, Supplier>(
            "SELECT id, name, address, phone, email, contact FROM suppliers ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to list suppliers: {}", e)))?;

        timer.observe_duration();

        Ok(suppliers)
    }

    /// Replace a supplier's stored fields.
    #[instrument(skip(self, input), fields(supplier_id = supplier_id))]
    pub async fn update_supplier(
        &self,
        supplier_id: i64,
        input: &CreateSupplier,
    ) -> Result<Option<Supplier>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["update_supplier"])
            .start_timer();

        let supplier = sqlx::query_as::<_, Supplier>(
            r#"
            UPDATE suppliers
            SET name = $2, address = $3, phone = $4, email = $5, contact = $6
            WHERE id = $1
            RETURNING id, name, address, phone, email, contact
            "#,
        )
        .bind(supplier_id)
        .bind(&input.name)
        .bind(&input.address)
        .bind(&input.phone)
        .bind(&input.email)
        .bind(&input.contact)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to update supplier: {}", e))
        })?;

        timer.observe_duration();

        Ok(supplier)
    }

    /// Delete a supplier.
    #[instrument(skip(self), fields(supplier_id = supplier_id))]
    pub async fn delete_supplier(&self, supplier_id: i64) -> Result<bool, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["delete_supplier"])
            .start_timer();

        let result = sqlx::query("DELETE FROM suppliers WHERE id = $1")
            .bind(supplier_id)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                AppError::DatabaseError(anyhow::anyhow!("Failed to delete supplier: {}", e))
            })?;

        timer.observe_duration();

        Ok(result.rows_affected() > 0)
    }

    // -------------------------------------------------------------------------
    // Product Operations
    // -------------------------------------------------------------------------

    /// Create a new catalog product.
    #[instrument(skip(self, input), fields(code = %input.code))]
    pub async fn create_product(&self, input: &CreateProduct) -> Result<Product, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["create_product"])
            .start_timer();

        let id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO products (
                code, name, format, sale_unit, pieces_per_box,
                piece_weight_kg, box_weight_kg, m2_per_box,
                price_box_with_vat, price_box_without_vat,
                price_piece_with_vat, price_piece_without_vat,
                price_m2_with_vat, price_m2_without_vat,
                color, material, is_external, supplier_id, image_url
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18, $19)
            RETURNING id
            "#,
        )
        .bind(&input.code)
        .bind(&input.name)
        .bind(&input.format)
        .bind(&input.sale_unit)
        .bind(input.pieces_per_box)
        .bind(input.piece_weight_kg)
        .bind(input.box_weight_kg)
        .bind(input.m2_per_box)
        .bind(input.price_box_with_vat)
        .bind(input.price_box_without_vat)
        .bind(input.price_piece_with_vat)
        .bind(input.price_piece_without_vat)
        .bind(input.price_m2_with_vat)
        .bind(input.price_m2_without_vat)
        .bind(&input.color)
        .bind(&input.material)
        .bind(input.is_external)
        .bind(input.supplier_id)
        .bind(&input.image_url)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db_err) if db_err.is_unique_violation() => {
                AppError::Conflict(anyhow::anyhow!(
                    "Product code '{}' already exists",
                    input.code
                ))
            }
            _ => AppError::DatabaseError(anyhow::anyhow!("Failed to create product: {}", e)),
        })?;

        timer.observe_duration();

        info!(product_id = id, code = %input.code, "Product created");

        self.get_product(id)
            .await?
            .ok_or_else(|| AppError::DatabaseError(anyhow::anyhow!("Created product not found")))
    }

    /// Get a product by ID, with the supplier name joined.
    #[instrument(skip(self), fields(product_id = product_id))]
    pub async fn get_product(&self, product_id: i64) -> Result<Option<Product>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["get_product"])
            .start_timer();

        let product = sqlx::query_as::<_, Product>(&format!(
            r#"
            SELECT {PRODUCT_COLUMNS}
            FROM products p
            LEFT JOIN suppliers s ON s.id = p.supplier_id
            WHERE p.id = $1
            "#
        ))
        .bind(product_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to get product: {}", e)))?;

        timer.observe_duration();

        Ok(product)
    }

    /// List all products.
    #[instrument(skip(self))]
    pub async fn list_products(&self) -> Result<Vec<Product>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["list_products"])
            .start_timer();

        let products = sqlx::query_as::<_, Product>(&format!(
            r#"
            SELECT {PRODUCT_COLUMNS}
            FROM products p
            LEFT JOIN suppliers s ON s.id = p.supplier_id
            ORDER BY p.id
            "#
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to list products: {}", e)))?;

        timer.observe_duration();

        Ok(products)
    }

    /// Update a product; absent fields stay untouched.
    #[instrument(skip(self, input), fields(product_id = product_id))]
    pub async fn update_product(
        &self,
        product_id: i64,
        input: &UpdateProduct,
    ) -> Result<Option<Product>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["update_product"])
            .start_timer();

        let result = sqlx::query(
            r#"
            UPDATE products
            SET code = COALESCE($2, code),
                name = COALESCE($3, name),
                format = COALESCE($4, format),
                sale_unit = COALESCE($5, sale_unit),
                pieces_per_box = COALESCE($6, pieces_per_box),
                piece_weight_kg = COALESCE($7, piece_weight_kg),
                box_weight_kg = COALESCE($8, box_weight_kg),
                m2_per_box = COALESCE($9, m2_per_box),
                price_box_with_vat = COALESCE($10, price_box_with_vat),
                price_box_without_vat = COALESCE($11, price_box_without_vat),
                price_piece_with_vat = COALESCE($12, price_piece_with_vat),
                price_piece_without_vat = COALESCE($13, price_piece_without_vat),
                price_m2_with_vat = COALESCE($14, price_m2_with_vat),
                price_m2_without_vat = COALESCE($15, price_m2_without_vat),
                color = COALESCE($16, color),
                material = COALESCE($17, material),
                is_external = COALESCE($18, is_external),
                supplier_id = COALESCE($19, supplier_id),
                image_url = COALESCE($20, image_url),
                updated_utc = NOW()
            WHERE id = $1
            "#,
        )
        .bind(product_id)
        .bind(&input.code)
        .bind(&input.name)
        .bind(&input.format)
        .bind(&input.sale_unit)
        .bind(input.pieces_per_box)
        .bind(input.piece_weight_kg)
        .bind(input.box_weight_kg)
        .bind(input.m2_per_box)
        .bind(input.price_box_with_vat)
        .bind(input.price_box_without_vat)
        .bind(input.price_piece_with_vat)
        .bind(input.price_piece_without_vat)
        .bind(input.price_m2_with_vat)
        .bind(input.price_m2_without_vat)
        .bind(&input.color)
        .bind(&input.material)
        .bind(input.is_external)
        .bind(input.supplier_id)
        .bind(&input.image_url)
        .execute(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db_err) if db_err.is_unique_violation() => {
                AppError::Conflict(anyhow::anyhow!("Product code already exists"))
            }
            _ => AppError::DatabaseError(anyhow::anyhow!("Failed to update product: {}", e)),
        })?;

        timer.observe_duration();

        if result.rows_affected() == 0 {
            return Ok(None);
        }

        info!(product_id = product_id, "Product updated");

        self.get_product(product_id).await
    }

    /// Delete a product. Inventory rows cascade.
    #[instrument(skip(self), fields(product_id = product_id))]
    pub async fn delete_product(&self, product_id: i64) -> Result<bool, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["delete_product"])
            .start_timer();

        let result = sqlx::query("DELETE FROM products WHERE id = $1")
            .bind(product_id)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                AppError::DatabaseError(anyhow::anyhow!("Failed to delete product: {}", e))
            })?;

        timer.observe_duration();

        let deleted = result.rows_affected() > 0;
        if deleted {
            info!(product_id = product_id, "Product deleted");
        }

        Ok(deleted)
    }

    // -------------------------------------------------------------------------
    // Inventory Operations
    // -------------------------------------------------------------------------

    /// Record an inventory row for a product.
    #[instrument(skip(self, input), fields(product_id = input.product_id))]
    pub async fn create_inventory_item(
        &self,
        input: &CreateInventoryItem,
    ) -> Result<InventoryItem, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["create_inventory_item"])
            .start_timer();

        if self.get_product(input.product_id).await?.is_none() {
            return Err(AppError::NotFound(anyhow::anyhow!(
                "Product {} not found",
                input.product_id
            )));
        }

        let item = sqlx::query_as::<_, InventoryItem>(
            r#"
            WITH inserted AS (
                INSERT INTO inventory (product_id, quantity, location)
                VALUES ($1, $2, $3)
                RETURNING id, product_id, quantity, location
            )
            SELECT i.id, i.product_id, i.quantity, i.location, p.name AS product_name
            FROM inserted i
            JOIN products p ON p.id = i.product_id
            "#,
        )
        .bind(input.product_id)
        .bind(input.quantity)
        .bind(&input.location)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to create inventory item: {}", e))
        })?;

        timer.observe_duration();

        info!(inventory_id = item.id, product_id = item.product_id, "Inventory item created");

        Ok(item)
    }

    /// Get an inventory row by ID.
    #[instrument(skip(self), fields(inventory_id = inventory_id))]
    pub async fn get_inventory_item(
        &self,
        inventory_id: i64,
    ) -> Result<Option<InventoryItem>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["get_inventory_item"])
            .start_timer();

        let item = sqlx::query_as::<_, InventoryItem>(
            r#"
            SELECT i.id, i.product_id, i.quantity, i.location, p.name AS product_name
            FROM inventory i
            JOIN products p ON p.id = i.product_id
            WHERE i.id = $1
            "#,
        )
        .bind(inventory_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to get inventory item: {}", e))
        })?;

        timer.observe_duration();

        Ok(item)
    }

    /// List all inventory rows.
    #[instrument(skip(self))]
    pub async fn list_inventory(&self) -> Result<Vec<InventoryItem>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["list_inventory"])
            .start_timer();

        let items = sqlx::query_as::<_, InventoryItem>(
            r#"
            SELECT i.id, i.product_id, i.quantity, i.location, p.name AS product_name
            FROM inventory i
            JOIN products p ON p.id = i.product_id
            ORDER BY i.id
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to list inventory: {}", e)))?;

        timer.observe_duration();

        Ok(items)
    }

    /// Update an inventory row; absent fields stay untouched.
    #[instrument(skip(self, input), fields(inventory_id = inventory_id))]
    pub async fn update_inventory_item(
        &self,
        inventory_id: i64,
        input: &UpdateInventoryItem,
    ) -> Result<Option<InventoryItem>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["update_inventory_item"])
            .start_timer();

        let result = sqlx::query(
            r#"
            UPDATE inventory
            SET quantity = COALESCE($2, quantity),
                location = COALESCE($3, location)
            WHERE id = $1
            "#,
        )
        .bind(inventory_id)
        .bind(input.quantity)
        .bind(&input.location)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to update inventory item: {}", e))
        })?;

        timer.observe_duration();

        if result.rows_affected() == 0 {
            return Ok(None);
        }

        self.get_inventory_item(inventory_id).await
    }

    /// Delete an inventory row.
    #[instrument(skip(self), fields(inventory_id = inventory_id))]
    pub async fn delete_inventory_item(&self, inventory_id: i64) -> Result<bool, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["delete_inventory_item"])
            .start_timer();

        let result = sqlx::query("DELETE FROM inventory WHERE id = $1")
            .bind(inventory_id)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                AppError::DatabaseError(anyhow::anyhow!("Failed to delete inventory item: {}", e))
            })?;

        timer.observe_duration();

        Ok(result.rows_affected() > 0)
    }

    // -------------------------------------------------------------------------
    // Branch Operations
    // -------------------------------------------------------------------------

    /// Create a new branch.
    #[instrument(skip(self, input))]
    pub async fn create_branch(&self, input: &CreateBranch) -> Result<Branch, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["create_branch"])
            .start_timer();

        let branch = sqlx::query_as::<_, Branch>(
            r#"
            INSERT INTO branches (name, address, phone)
            VALUES ($1, $2, $3)
            RETURNING id, name, address, phone
            "#,
        )
        .bind(&input.name)
        .bind(&input.address)
        .bind(&input.phone)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to create branch: {}", e)))?;

        timer.observe_duration();

        info!(branch_id = branch.id, name = %branch.name, "Branch created");

        Ok(branch)
    }

    /// Get a branch by ID.
    #[instrument(skip(self), fields(branch_id = branch_id))]
    pub async fn get_branch(&self, branch_id: i64) -> Result<Option<Branch>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["get_branch"])
            .start_timer();

        let branch = sqlx::query_as::<_, Branch>(
            "SELECT id, name, address, phone FROM branches WHERE id = $1",
        )
        .bind(branch_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to get branch: {}", e)))?;

        timer.observe_duration();

        Ok(branch)
    }

    /// List all branches.
    #[instrument(skip(self))]
    pub async fn list_branches(&self) -> Result<Vec<Branch>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["list_branches"])
            .start_timer();

        let branches = sqlx::query_as::<_, Branch>(
            "SELECT id, name, address, phone FROM branches ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to list branches: {}", e)))?;

        timer.observe_duration();

        Ok(branches)
    }

    /// Replace a branch's stored fields.
    #[instrument(skip(self, input), fields(branch_id = branch_id))]
    pub async fn update_branch(
        &self,
        branch_id: i64,
        input: &CreateBranch,
    ) -> Result<Option<Branch>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["update_branch"])
            .start_timer();

        let branch = sqlx::query_as::<_, Branch>(
            r#"
            UPDATE branches
            SET name = $2, address = $3, phone = $4
            WHERE id = $1
            RETURNING id, name, address, phone
            "#,
        )
        .bind(branch_id)
        .bind(&input.name)
        .bind(&input.address)
        .bind(&input.phone)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to update branch: {}", e)))?;

        timer.observe_duration();

        Ok(branch)
    }

    /// Delete a branch.
    #[instrument(skip(self), fields(branch_id = branch_id))]
    pub async fn delete_branch(&self, branch_id: i64) -> Result<bool, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["delete_branch"])
            .start_timer();

        let result = sqlx::query("DELETE FROM branches WHERE id = $1")
            .bind(branch_id)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                AppError::DatabaseError(anyhow::anyhow!("Failed to delete branch: {}", e))
            })?;

        timer.observe_duration();

        Ok(result.rows_affected() > 0)
    }

    // -------------------------------------------------------------------------
    // Sales Order Operations
    // -------------------------------------------------------------------------

    /// List all sales orders, newest first.
    #[instrument(skip(self))]
    pub async fn list_sales_orders(&self) -> Result<Vec<SalesOrder>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["list_sales_orders"])
            .start_timer();

        let orders = sqlx::query_as::<_, SalesOrder>(
            r#"
            SELECT id, quotation_id, client_name, created_utc, total, user_id, project_id, status
            FROM sales_orders
            ORDER BY id DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to list sales orders: {}", e))
        })?;

        timer.observe_duration();

        Ok(orders)
    }

    /// Get a sales order with its line items.
    #[instrument(skip(self), fields(order_id = order_id))]
    pub async fn get_sales_order(
        &self,
        order_id: i64,
    ) -> Result<Option<SalesOrderResponse>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["get_sales_order"])
            .start_timer();

        let order = sqlx::query_as::<_, SalesOrder>(
            r#"
            SELECT id, quotation_id, client_name, created_utc, total, user_id, project_id, status
            FROM sales_orders
            WHERE id = $1
            "#,
        )
        .bind(order_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to get sales order: {}", e))
        })?;

        let Some(order) = order else {
            timer.observe_duration();
            return Ok(None);
        };

        let details = sqlx::query_as::<_, SalesOrderDetail>(
            r#"
            SELECT id, order_id, product_id, quantity, unit_price, total, variant
            FROM sales_order_details
            WHERE order_id = $1
            ORDER BY id
            "#,
        )
        .bind(order_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to get sales order details: {}", e))
        })?;

        timer.observe_duration();

        Ok(Some(SalesOrderResponse { order, details }))
    }
}
