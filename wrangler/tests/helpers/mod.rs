//! Shared test helpers: in-memory warehouse and LIMS, fixture CSVs

#![allow(dead_code)]

use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex};
use wrangler::lims::{Lims, LimsResponse};
use wrangler::AppState;
use wrangler_common::config::WranglerConfig;
use wrangler_common::db::{Warehouse, WarehouseRow};
use wrangler_common::{Error, Result};

/// Warehouse backed by a Vec
#[derive(Default)]
pub struct InMemoryWarehouse {
    pub rows: Mutex<Vec<WarehouseRow>>,
    pub fail_mark_wrangled: bool,
}

impl InMemoryWarehouse {
    pub fn new(rows: Vec<WarehouseRow>) -> Self {
        Self {
            rows: Mutex::new(rows),
            fail_mark_wrangled: false,
        }
    }

    pub fn wrangled_barcodes(&self) -> Vec<String> {
        let rows = self.rows.lock().unwrap();
        let mut barcodes: Vec<String> = rows
            .iter()
            .filter(|row| row.wrangled.is_some())
            .map(|row| row.container_barcode.clone())
            .collect();
        barcodes.dedup();
        barcodes
    }
}

#[async_trait]
impl Warehouse for InMemoryWarehouse {
    async fn labware_rows(&self, labware_barcode: &str) -> Result<Vec<WarehouseRow>> {
        let rows = self.rows.lock().unwrap();
        Ok(rows
            .iter()
            .filter(|row| row.container_barcode == labware_barcode)
            .cloned()
            .collect())
    }

    async fn unwrangled_rows(&self, destination: &str) -> Result<Vec<WarehouseRow>> {
        let rows = self.rows.lock().unwrap();
        let mut selected: Vec<WarehouseRow> = rows
            .iter()
            .filter(|row| row.destination.as_deref() == Some(destination) && row.wrangled.is_none())
            .cloned()
            .collect();
        selected.sort_by(|a, b| a.container_barcode.cmp(&b.container_barcode));
        Ok(selected)
    }

    async fn mark_wrangled(&self, labware_barcodes: &[String]) -> Result<u64> {
        if self.fail_mark_wrangled {
            return Err(Error::Database(sqlx::Error::PoolClosed));
        }

        let now = chrono::Utc::now().naive_utc();
        let mut rows = self.rows.lock().unwrap();
        let mut updated = 0;
        for row in rows.iter_mut() {
            if labware_barcodes.contains(&row.container_barcode) {
                row.wrangled = Some(now);
                updated += 1;
            }
        }
        Ok(updated)
    }
}

/// A POST seen by [`RecordingLims`]
#[derive(Debug, Clone)]
pub struct PostedRequest {
    pub endpoint: String,
    pub body: Value,
}

/// LIMS double: fixed UUIDs, scripted POST statuses, records every POST
pub struct RecordingLims {
    /// (entity, name) → uuid; missing entries are EntityNotFound
    pub uuids: HashMap<(String, String), String>,
    /// endpoint → status returned by POST (default 201)
    pub statuses: HashMap<String, u16>,
    pub posts: Mutex<Vec<PostedRequest>>,
    pub lookups: Mutex<Vec<(String, String)>>,
    pub fail_posts: bool,
}

impl RecordingLims {
    pub fn new() -> Self {
        Self {
            uuids: HashMap::new(),
            statuses: HashMap::new(),
            posts: Mutex::new(Vec::new()),
            lookups: Mutex::new(Vec::new()),
            fail_posts: false,
        }
    }

    /// Knows every default purpose and the given studies
    pub fn with_defaults(studies: &[(&str, &str)]) -> Self {
        let purposes = WranglerConfig::default().purposes;
        let mut lims = Self::new();
        for (name, uuid) in [
            (purposes.extract_tube_rack_96, "purpose-tr-96"),
            (purposes.extract_tube_rack_48, "purpose-tr-48"),
            (purposes.lysate_tube_rack, "purpose-tr-lysate"),
            (purposes.extract_plate, "purpose-plate"),
            (purposes.lysate_plate, "purpose-plate-lysate"),
        ] {
            lims.uuids
                .insert(("plate_purposes".to_string(), name), uuid.to_string());
        }
        for (study, uuid) in studies {
            lims.uuids
                .insert(("studies".to_string(), study.to_string()), uuid.to_string());
        }
        lims
    }

    pub fn with_status(mut self, endpoint: &str, status: u16) -> Self {
        self.statuses.insert(endpoint.to_string(), status);
        self
    }

    pub fn posts(&self) -> Vec<PostedRequest> {
        self.posts.lock().unwrap().clone()
    }

    pub fn lookups(&self) -> Vec<(String, String)> {
        self.lookups.lock().unwrap().clone()
    }
}

#[async_trait]
impl Lims for RecordingLims {
    async fn entity_uuid(&self, entity: &str, name: &str) -> Result<String> {
        self.lookups
            .lock()
            .unwrap()
            .push((entity.to_string(), name.to_string()));

        self.uuids
            .get(&(entity.to_string(), name.to_string()))
            .cloned()
            .ok_or_else(|| Error::EntityNotFound {
                entity: entity.to_string(),
                name: name.to_string(),
            })
    }

    async fn post(&self, endpoint: &str, body: &Value) -> Result<LimsResponse> {
        self.posts.lock().unwrap().push(PostedRequest {
            endpoint: endpoint.to_string(),
            body: body.clone(),
        });

        if self.fail_posts {
            return Err(Error::Lims("connection refused".to_string()));
        }

        Ok(LimsResponse {
            status: self.statuses.get(endpoint).copied().unwrap_or(201),
            body: json!({}),
        })
    }
}

/// Valid configuration pointing at `rack_dir`
pub fn test_config(rack_dir: &Path) -> WranglerConfig {
    let mut config = WranglerConfig::from_toml_str(
        r#"
        [mlwh]
        host = "localhost"
        user = "root"
        password = "root"
        database = "mlwarehouse_test"

        [lims]
        host = "example.com"
        api_key = "123"
        "#,
    )
    .expect("Test config should parse");
    config.tube_racks.dir = rack_dir.to_path_buf();
    config
}

pub fn app_state(
    warehouse: Arc<InMemoryWarehouse>,
    lims: Arc<RecordingLims>,
    config: WranglerConfig,
) -> AppState {
    AppState::new(warehouse, lims, Arc::new(config))
}

/// Warehouse row for a tube in a rack
pub fn tube_row(container: &str, tube: &str, coordinate: &str, supplier: &str) -> WarehouseRow {
    WarehouseRow {
        container_barcode: container.to_string(),
        tube_barcode: Some(tube.to_string()),
        coordinate: coordinate.to_string(),
        study: "heron".to_string(),
        supplier_sample_id: supplier.to_string(),
        sample_state: Some("Extract".to_string()),
        destination: Some("CGAP Extraction".to_string()),
        wrangled: None,
    }
}

/// Warehouse row for a plate well
pub fn well_row(container: &str, coordinate: &str, supplier: &str) -> WarehouseRow {
    WarehouseRow {
        tube_barcode: None,
        study: "heron r and d".to_string(),
        ..tube_row(container, "", coordinate, supplier)
    }
}

/// Six-tube rack DN123: TB123..TB128 at A01..B03
pub fn dn123_rows() -> Vec<WarehouseRow> {
    DN123_TUBES
        .iter()
        .enumerate()
        .map(|(i, (coordinate, tube))| tube_row("DN123", tube, coordinate, &format!("sample {}", i)))
        .collect()
}

pub const DN123_TUBES: [(&str, &str); 6] = [
    ("A01", "TB123"),
    ("A02", "TB124"),
    ("A03", "TB125"),
    ("B01", "TB126"),
    ("B02", "TB127"),
    ("B03", "TB128"),
];

/// Write `<barcode>.csv` with the given (coordinate, tube) rows
pub fn write_rack_csv(dir: &Path, barcode: &str, rows: &[(&str, &str)]) {
    let content: String = rows
        .iter()
        .map(|(coordinate, tube)| format!("{},{}\n", coordinate, tube))
        .collect();
    std::fs::write(dir.join(format!("{}.csv", barcode)), content).expect("Should write CSV");
}
