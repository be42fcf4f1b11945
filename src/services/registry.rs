//! Tool registry and the singleton settings record.
//!
//! Request handlers never read settings from the database directly: they take
//! the current `Arc<Settings>` snapshot once and keep it for the whole
//! request. Admin writes commit the row and then swap the snapshot while
//! holding the write lock, so concurrent updates cannot publish out of order.

use crate::models::{
    settings::{
        DEFAULT_CONTACT_EMAIL, DEFAULT_MAX_FILE_SIZE, DEFAULT_SITE_NAME, Settings, SettingsUpdate,
    },
    tool::{Tool, ToolUpdate},
};
use chrono::Utc;
use sqlx::SqlitePool;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::info;
use uuid::Uuid;

const DEFAULT_CATEGORY: &str = "PDF Tools";

struct DefaultTool {
    name: &'static str,
    slug: &'static str,
    icon: &'static str,
    description: &'static str,
    order: i64,
}

const DEFAULT_TOOLS: [DefaultTool; 12] = [
    DefaultTool {
        name: "Merge PDF",
        slug: "merge-pdf",
        icon: "Merge",
        description: "Combine multiple PDFs into one document.",
        order: 1,
    },
    DefaultTool {
        name: "Split PDF",
        slug: "split-pdf",
        icon: "Scissors",
        description: "Extract pages from your PDF or save each page as a separate PDF.",
        order: 2,
    },
    DefaultTool {
        name: "Compress PDF",
        slug: "compress-pdf",
        icon: "Minimize",
        description: "Reduce the file size of your PDF while optimizing for maximal PDF quality.",
        order: 3,
    },
    DefaultTool {
        name: "Image to PDF",
        slug: "img-to-pdf",
        icon: "Image",
        description: "Convert JPG and PNG images into a PDF document instantly.",
        order: 4,
    },
    DefaultTool {
        name: "PDF to Word",
        slug: "pdf-to-word",
        icon: "FileText",
        description: "Convert your PDF to WORD documents with incredible accuracy.",
        order: 5,
    },
    DefaultTool {
        name: "PDF to PowerPoint",
        slug: "pdf-to-ppt",
        icon: "Presentation",
        description: "Turn your PDF files into easy to edit PPT and PPTX slideshows.",
        order: 6,
    },
    DefaultTool {
        name: "PDF to Excel",
        slug: "pdf-to-excel",
        icon: "Sheet",
        description: "Pull data straight from PDFs into Excel spreadsheets in a few short seconds.",
        order: 7,
    },
    DefaultTool {
        name: "Excel to PDF",
        slug: "excel-to-pdf",
        icon: "FileSpreadsheet",
        description: "Convert Excel spreadsheets to PDF.",
        order: 8,
    },
    DefaultTool {
        name: "Edit PDF",
        slug: "edit-pdf",
        icon: "PenTool",
        description: "Add text, shapes, images and freehand annotations to your PDF.",
        order: 9,
    },
    DefaultTool {
        name: "PDF to JPG",
        slug: "pdf-to-jpg",
        icon: "Image",
        description: "Convert each PDF page into a JPG or extract all images contained in a PDF.",
        order: 10,
    },
    DefaultTool {
        name: "Unlock PDF",
        slug: "unlock-pdf",
        icon: "Unlock",
        description: "Remove PDF password security, giving you the freedom to use your data as you want.",
        order: 11,
    },
    DefaultTool {
        name: "Protect PDF",
        slug: "protect-pdf",
        icon: "Lock",
        description: "Protect PDF files with a password. Encrypt PDF documents to prevent unauthorized access.",
        order: 12,
    },
];

const TOOL_COLUMNS: &str =
    "id, name, slug, icon, description, enabled, category, sort_order, created_at, updated_at";

const SETTINGS_COLUMNS: &str =
    "site_name, max_file_size, maintenance_mode, contact_email, version, created_at, updated_at";

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("tool `{0}` not found")]
    ToolNotFound(String),
    #[error("{0}")]
    InvalidUpdate(String),
    #[error("settings record is missing")]
    SettingsMissing,
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

pub type RegistryResult<T> = Result<T, RegistryError>;

#[derive(Clone)]
pub struct Registry {
    db: Arc<SqlitePool>,
    settings: Arc<RwLock<Arc<Settings>>>,
}

impl Registry {
    /// Seed missing defaults and load the first settings snapshot.
    pub async fn load(db: Arc<SqlitePool>) -> RegistryResult<Self> {
        if seed_settings(&db).await? {
            info!("Default settings created");
        }
        let seeded = seed_tools(&db).await?;
        if seeded > 0 {
            info!("Seeded {} default tool(s)", seeded);
        }
        let snapshot = fetch_settings(&db).await?;
        Ok(Self {
            db,
            settings: Arc::new(RwLock::new(Arc::new(snapshot))),
        })
    }

    /// Current settings snapshot.
    pub async fn settings(&self) -> Arc<Settings> {
        self.settings.read().await.clone()
    }

    /// Enabled tools by `order`. An empty table is reseeded first.
    pub async fn list_enabled_tools(&self) -> RegistryResult<Vec<Tool>> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM tools")
            .fetch_one(&*self.db)
            .await?;
        if count == 0 {
            seed_tools(&self.db).await?;
        }

        let sql = format!(
            "SELECT {} FROM tools WHERE enabled = 1 ORDER BY sort_order, name",
            TOOL_COLUMNS
        );
        Ok(sqlx::query_as::<_, Tool>(&sql)
            .fetch_all(&*self.db)
            .await?)
    }

    pub async fn list_all_tools(&self) -> RegistryResult<Vec<Tool>> {
        let sql = format!("SELECT {} FROM tools ORDER BY sort_order, name", TOOL_COLUMNS);
        Ok(sqlx::query_as::<_, Tool>(&sql)
            .fetch_all(&*self.db)
            .await?)
    }

    /// Apply the provided fields of `update` to the tool with `id`.
    pub async fn update_tool(&self, id: &str, update: ToolUpdate) -> RegistryResult<Tool> {
        let tool_id =
            Uuid::parse_str(id).map_err(|_| RegistryError::ToolNotFound(id.to_string()))?;
        if let Some(name) = update.name.as_deref() {
            if name.trim().is_empty() {
                return Err(RegistryError::InvalidUpdate("Tool name cannot be empty".into()));
            }
        }

        let result = sqlx::query(
            r#"
            UPDATE tools SET
                name = COALESCE(?, name),
                icon = COALESCE(?, icon),
                description = COALESCE(?, description),
                enabled = COALESCE(?, enabled),
                category = COALESCE(?, category),
                sort_order = COALESCE(?, sort_order),
                updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(update.name)
        .bind(update.icon)
        .bind(update.description)
        .bind(update.enabled)
        .bind(update.category)
        .bind(update.order)
        .bind(Utc::now())
        .bind(tool_id)
        .execute(&*self.db)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RegistryError::ToolNotFound(id.to_string()));
        }

        let sql = format!("SELECT {} FROM tools WHERE id = ?", TOOL_COLUMNS);
        Ok(sqlx::query_as::<_, Tool>(&sql)
            .bind(tool_id)
            .fetch_one(&*self.db)
            .await?)
    }

    /// Replace the provided tracked fields, bump `version` and publish the
    /// new snapshot.
    pub async fn update_settings(&self, update: SettingsUpdate) -> RegistryResult<Arc<Settings>> {
        if let Some(size) = update.max_file_size {
            if size <= 0 {
                return Err(RegistryError::InvalidUpdate(
                    "maxFileSize must be a positive number of bytes".into(),
                ));
            }
        }

        let mut snapshot = self.settings.write().await;

        let mut tx = self.db.begin().await?;
        let result = sqlx::query(
            r#"
            UPDATE settings SET
                site_name = COALESCE(?, site_name),
                max_file_size = COALESCE(?, max_file_size),
                maintenance_mode = COALESCE(?, maintenance_mode),
                contact_email = COALESCE(?, contact_email),
                version = version + 1,
                updated_at = ?
            WHERE id = 1
            "#,
        )
        .bind(update.site_name)
        .bind(update.max_file_size)
        .bind(update.maintenance_mode)
        .bind(update.contact_email)
        .bind(Utc::now())
        .execute(&mut *tx)
        .await?;
        if result.rows_affected() == 0 {
            return Err(RegistryError::SettingsMissing);
        }
        let sql = format!("SELECT {} FROM settings WHERE id = 1", SETTINGS_COLUMNS);
        let updated = sqlx::query_as::<_, Settings>(&sql)
            .fetch_one(&mut *tx)
            .await?;
        tx.commit().await?;

        let updated = Arc::new(updated);
        *snapshot = updated.clone();
        info!(
            "Settings updated to version {} (maintenance: {})",
            updated.version, updated.maintenance_mode
        );
        Ok(updated)
    }
}

/// Insert the default settings row if none exists. Returns whether it did.
async fn seed_settings(db: &SqlitePool) -> RegistryResult<bool> {
    let now = Utc::now();
    let result = sqlx::query(
        r#"
        INSERT OR IGNORE INTO settings
            (id, site_name, max_file_size, maintenance_mode, contact_email, version, created_at, updated_at)
        VALUES (1, ?, ?, 0, ?, 1, ?, ?)
        "#,
    )
    .bind(DEFAULT_SITE_NAME)
    .bind(DEFAULT_MAX_FILE_SIZE)
    .bind(DEFAULT_CONTACT_EMAIL)
    .bind(now)
    .bind(now)
    .execute(db)
    .await?;
    Ok(result.rows_affected() > 0)
}

/// Insert each default tool whose slug is missing. Existing rows are left
/// exactly as they are.
async fn seed_tools(db: &SqlitePool) -> RegistryResult<usize> {
    let mut seeded = 0;
    for tool in &DEFAULT_TOOLS {
        let now = Utc::now();
        let result = sqlx::query(
            r#"
            INSERT OR IGNORE INTO tools
                (id, name, slug, icon, description, enabled, category, sort_order, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, 1, ?, ?, ?, ?)
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(tool.name)
        .bind(tool.slug)
        .bind(tool.icon)
        .bind(tool.description)
        .bind(DEFAULT_CATEGORY)
        .bind(tool.order)
        .bind(now)
        .bind(now)
        .execute(db)
        .await?;
        if result.rows_affected() > 0 {
            tracing::debug!("Seeded tool: {}", tool.name);
            seeded += 1;
        }
    }
    Ok(seeded)
}

async fn fetch_settings(db: &SqlitePool) -> RegistryResult<Settings> {
    let sql = format!("SELECT {} FROM settings WHERE id = 1", SETTINGS_COLUMNS);
    sqlx::query_as::<_, Settings>(&sql)
        .fetch_optional(db)
        .await?
        .ok_or(RegistryError::SettingsMissing)
}
