//! Export command - write an issued certificate in the requested format.

use certdesk_issuer::ExportFormat;
use std::io::Write;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use uuid::Uuid;

use crate::context::AppContext;
use crate::error::CliResult;
use crate::output;

pub async fn run(
    ctx: &AppContext,
    id: Uuid,
    format: ExportFormat,
    output_path: Option<&Path>,
    password: Option<&str>,
) -> CliResult<()> {
    let order = ctx.orchestrator.get_order(id).await?;
    let bundle = ctx.exporter.export(&order, format, password)?;

    if output_path == Some(Path::new("-")) {
        std::io::stdout().write_all(&bundle.data)?;
        return Ok(());
    }

    let path = output_path
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from(bundle.filename));
    write_private(&path, &bundle.data, holds_key(format)).await?;

    output::success(&format!("Wrote {} ({} bytes)", path.display(), bundle.data.len()));
    if format == ExportFormat::Pfx && password.is_none_or(str::is_empty) {
        output::warn(&format!(
            "PKCS#12 password is the default '{}'",
            certdesk_issuer::DEFAULT_PFX_PASSWORD
        ));
    }
    Ok(())
}

fn holds_key(format: ExportFormat) -> bool {
    matches!(format, ExportFormat::Pfx | ExportFormat::Zip)
}

async fn write_private(path: &Path, data: &[u8], private: bool) -> std::io::Result<()> {
    let mut options = tokio::fs::OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    if private {
        options.mode(0o600);
    }
    let mut file = options.open(path).await?;

    // mode() only applies to newly created files
    #[cfg(unix)]
    if private {
        use std::os::unix::fs::PermissionsExt;
        file.set_permissions(std::fs::Permissions::from_mode(0o600))
            .await?;
    }
    #[cfg(not(unix))]
    let _ = private;

    file.write_all(data).await?;
    file.flush().await
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::os::unix::fs::PermissionsExt;

    async fn mode(path: &Path) -> u32 {
        tokio::fs::metadata(path).await.unwrap().permissions().mode() & 0o777
    }

    #[tokio::test]
    async fn test_key_bundles_are_owner_only() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("certificate.zip");

        write_private(&path, b"bundle", true).await.unwrap();
        assert_eq!(mode(&path).await, 0o600);
        assert_eq!(tokio::fs::read(&path).await.unwrap(), b"bundle");
    }

    #[tokio::test]
    async fn test_existing_file_is_tightened() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("certificate.pfx");
        tokio::fs::write(&path, b"old contents that are longer").await.unwrap();
        tokio::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o644))
            .await
            .unwrap();

        write_private(&path, b"new", true).await.unwrap();
        assert_eq!(mode(&path).await, 0o600);
        assert_eq!(tokio::fs::read(&path).await.unwrap(), b"new");
    }
}
