//! Server command implementation

use std::path::Path;

use anyhow::Result;
use khata_server::ServerConfig;

use super::open_db;

pub async fn cmd_serve(
    db_path: &Path,
    host: &str,
    port: u16,
    cors_origins: Vec<String>,
) -> Result<()> {
    println!("🚀 Starting Khata web server...");
    println!("   Database: {}", db_path.display());
    println!("   Listening: http://{}:{}", host, port);
    if !cors_origins.is_empty() {
        println!("   CORS origins: {}", cors_origins.join(", "));
    }

    let db = open_db(db_path)?;
    let config = ServerConfig {
        allowed_origins: cors_origins,
    };

    khata_server::serve(db, host, port, config).await
}
