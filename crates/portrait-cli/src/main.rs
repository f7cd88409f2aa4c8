//! Portrait CLI: crop and upload profile pictures from the command line.
//!
//! Reads PORTRAIT_API_URL and PORTRAIT_TOKEN (a `.env` file is honored);
//! `--api-url` and `--token` override them.

use std::path::Path;

use anyhow::Context;
use clap::{Parser, Subcommand};
use portrait_api_client::ProfilePictureService;
use portrait_cli::{init_tracing, print_json, user_facing, CropArgs};
use portrait_core::ClientConfig;

#[derive(Parser)]
#[command(name = "portrait", about = "Profile picture CLI")]
struct Cli {
    /// Base URL of the profile API, including its /api prefix
    #[arg(long, global = true)]
    api_url: Option<String>,

    /// Bearer token of the signed-in user
    #[arg(long, global = true)]
    token: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Crop an image locally and write the JPEG result
    Crop {
        #[command(flatten)]
        crop: CropArgs,
        /// Where to write the cropped JPEG
        #[arg(long, short)]
        output: std::path::PathBuf,
    },
    /// Crop an image and upload it as the profile picture
    Upload {
        #[command(flatten)]
        crop: CropArgs,
    },
    /// Remove the current profile picture
    Remove,
    /// Show the signed-in user's profile
    Me,
    /// Show a public profile by username
    Show {
        username: String,
    },
    /// Set the signed-in user's username
    SetUsername {
        username: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    run(Cli::parse()).await
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Commands::Crop { crop, output } => write_crop(&crop, &output).await?,
        command => {
            let (service, token) = connect(cli.api_url, cli.token)?;
            run_online(command, &service, token.as_deref()).await?;
        }
    }

    Ok(())
}

async fn write_crop(crop: &CropArgs, output: &Path) -> anyhow::Result<()> {
    let encoded = crop.render().await?;
    tokio::fs::write(output, &encoded.data)
        .await
        .with_context(|| format!("Failed to write {}", output.display()))?;
    print_json(&serde_json::json!({
        "output": output.display().to_string(),
        "width": encoded.width,
        "height": encoded.height,
        "contentType": encoded.content_type,
        "size": encoded.len(),
    }))
}

/// Load the API configuration; only commands that talk to the backend need it.
fn connect(
    api_url: Option<String>,
    token: Option<String>,
) -> anyhow::Result<(ProfilePictureService, Option<String>)> {
    let mut config = ClientConfig::from_env()
        .context("Failed to load configuration. Check the PORTRAIT_* environment variables")?;
    if let Some(api_url) = api_url {
        config.api_url = api_url;
        config.validate()?;
    }
    if token.is_some() {
        config.token = token;
    }
    let token = config.token().map(str::to_string);

    let service =
        ProfilePictureService::from_config(&config).context("Failed to create API client")?;
    Ok((service, token))
}

async fn run_online(
    command: Commands,
    service: &ProfilePictureService,
    token: Option<&str>,
) -> anyhow::Result<()> {
    match command {
        Commands::Crop { crop, output } => write_crop(&crop, &output).await?,
        Commands::Upload { crop } => {
            let encoded = crop.render().await?;
            let descriptor = service.upload(token, encoded).await.map_err(user_facing)?;
            print_json(&descriptor)?;
        }
        Commands::Remove => {
            service.remove(token).await.map_err(user_facing)?;
            print_json(&serde_json::json!({ "success": true, "message": "Profile picture removed" }))?;
        }
        Commands::Me => {
            let profile = service.refresh(token).await.map_err(user_facing)?;
            print_json(&serde_json::json!({
                "displayName": profile.display_name(),
                "initials": profile.initials(),
                "profile": profile,
            }))?;
        }
        Commands::Show { username } => {
            let profile = service.lookup(&username).await.map_err(user_facing)?;
            print_json(&profile)?;
        }
        Commands::SetUsername { username } => {
            let response = service
                .set_username(token, &username)
                .await
                .map_err(user_facing)?;
            print_json(&response)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageFormat, Rgb, RgbImage};

    #[tokio::test]
    async fn crop_works_without_valid_api_config() {
        std::env::set_var("PORTRAIT_API_URL", "not-a-url");
        let dir = std::env::temp_dir();
        let input = dir.join(format!("portrait-main-{}.png", std::process::id()));
        let output = dir.join(format!("portrait-main-{}.jpg", std::process::id()));
        RgbImage::from_pixel(40, 40, Rgb([200, 10, 10]))
            .save_with_format(&input, ImageFormat::Png)
            .unwrap();

        let cli = Cli::try_parse_from([
            "portrait",
            "crop",
            input.to_str().unwrap(),
            "--output",
            output.to_str().unwrap(),
        ])
        .unwrap();
        let result = run(cli).await;
        let written = std::fs::read(&output);
        std::fs::remove_file(&input).ok();
        std::fs::remove_file(&output).ok();

        result.unwrap();
        assert_eq!(image::guess_format(&written.unwrap()).unwrap(), ImageFormat::Jpeg);
    }

    #[test]
    fn connect_rejects_bad_api_url_override() {
        let err = connect(Some("ftp://example.com".to_string()), None)
            .err()
            .unwrap();
        assert!(format!("{:#}", err).contains("PORTRAIT_API_URL"));
    }
}
