use crate::client::AdminService;
use crate::commands::TargetArgs;
use crate::utils::CliError;
use clap::Args;
use std::io::Write;

#[derive(Args, Debug, Clone)]
pub struct VersionArgs {
    #[clap(flatten)]
    pub target: TargetArgs,
}

pub async fn version_command<W: Write, S: AdminService + ?Sized>(
    writer: &mut W,
    service: &S,
) -> Result<(), CliError> {
    let version = service.version().await?;
    writeln!(writer, "Chroma Server Version: {}", version)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::tenant::tests::MockAdminService;
    use std::io::Cursor;

    #[tokio::test]
    async fn test_version() {
        let service = MockAdminService::default();
        let mut out = Cursor::new(Vec::new());
        version_command(&mut out, &service).await.unwrap();
        assert_eq!(
            String::from_utf8(out.into_inner()).unwrap(),
            "Chroma Server Version: 1.0.0\n"
        );
    }
}
