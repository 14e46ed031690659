//! Command-line interface: the catalogue side of the tool plus `view`, which
//! opens the inspection window.

use anyhow::{Context, Result, anyhow, bail};
use argh::FromArgs;
use std::path::PathBuf;
use thermal_inspector::cache::Cache;
use thermal_inspector::export::{build_report, report_file_name, write_report};
use thermal_inspector::gateway::{
    ApiClient, InspectionPatch, InspectionReq, InspectionStatus, Transformer, UploadFile, validate,
};
use thermal_inspector::repository::AnnotationRepository;

#[derive(FromArgs, Debug)]
/// Thermal inspection of distribution transformers.
pub struct Cli {
    /// backend base URL, overriding the config file
    #[argh(option)]
    pub api_url: Option<String>,

    /// user name recorded with uploads and edits
    #[argh(option)]
    pub user: Option<String>,

    #[argh(subcommand)]
    pub command: Command,
}

#[derive(FromArgs, Debug, PartialEq)]
#[argh(subcommand)]
pub enum Command {
    View(ViewArgs),
    ListTransformers(ListTransformersArgs),
    AddTransformer(AddTransformerArgs),
    UpdateTransformer(UpdateTransformerArgs),
    DeleteTransformer(DeleteTransformerArgs),
    StarTransformer(StarTransformerArgs),
    ListInspections(ListInspectionsArgs),
    AddInspection(AddInspectionArgs),
    StarInspection(StarInspectionArgs),
    DeleteInspection(DeleteInspectionArgs),
    UploadBaseline(UploadBaselineArgs),
    UploadImage(UploadImageArgs),
    ExportDataset(ExportDatasetArgs),
    ExportFeedback(ExportFeedbackArgs),
}

#[derive(FromArgs, Debug, PartialEq)]
/// Open the inspection window.
#[argh(subcommand, name = "view")]
pub struct ViewArgs {
    /// transformer number
    #[argh(positional)]
    pub transformer: String,

    /// inspection id
    #[argh(positional)]
    pub inspection: String,
}

#[derive(FromArgs, Debug, PartialEq)]
/// List transformers.
#[argh(subcommand, name = "list-transformers")]
pub struct ListTransformersArgs {}

#[derive(FromArgs, Debug, PartialEq)]
/// Add a transformer.
#[argh(subcommand, name = "add-transformer")]
pub struct AddTransformerArgs {
    /// transformer number
    #[argh(positional)]
    pub number: String,

    /// pole number
    #[argh(option)]
    pub pole: Option<String>,

    /// region
    #[argh(option)]
    pub region: Option<String>,

    /// transformer type, e.g. Bulk or Distribution
    #[argh(option)]
    pub kind: Option<String>,

    /// capacity
    #[argh(option)]
    pub capacity: Option<String>,

    /// location details
    #[argh(option)]
    pub location: Option<String>,
}

#[derive(FromArgs, Debug, PartialEq)]
/// Change fields of a transformer; omitted fields keep their value.
#[argh(subcommand, name = "update-transformer")]
pub struct UpdateTransformerArgs {
    /// transformer number
    #[argh(positional)]
    pub number: String,

    /// pole number
    #[argh(option)]
    pub pole: Option<String>,

    /// region
    #[argh(option)]
    pub region: Option<String>,

    /// transformer type
    #[argh(option)]
    pub kind: Option<String>,

    /// capacity
    #[argh(option)]
    pub capacity: Option<String>,

    /// location details
    #[argh(option)]
    pub location: Option<String>,
}

#[derive(FromArgs, Debug, PartialEq)]
/// Delete a transformer.
#[argh(subcommand, name = "delete-transformer")]
pub struct DeleteTransformerArgs {
    /// transformer number
    #[argh(positional)]
    pub number: String,
}

#[derive(FromArgs, Debug, PartialEq)]
/// Star (or with --off, unstar) a transformer.
#[argh(subcommand, name = "star-transformer")]
pub struct StarTransformerArgs {
    /// transformer number
    #[argh(positional)]
    pub number: String,

    /// remove the star
    #[argh(switch)]
    pub off: bool,
}

#[derive(FromArgs, Debug, PartialEq)]
/// List the inspections of a transformer, or the full inspection table.
#[argh(subcommand, name = "list-inspections")]
pub struct ListInspectionsArgs {
    /// transformer number; all inspections when omitted
    #[argh(positional)]
    pub transformer: Option<String>,
}

#[derive(FromArgs, Debug, PartialEq)]
/// Add an inspection to a transformer.
#[argh(subcommand, name = "add-inspection")]
pub struct AddInspectionArgs {
    /// transformer number
    #[argh(positional)]
    pub transformer: String,

    /// inspection time, ISO 8601
    #[argh(option)]
    pub inspected_at: Option<String>,

    /// maintenance date, ISO 8601
    #[argh(option)]
    pub maintenance_date: Option<String>,

    /// status: in-progress, completed or needs-review
    #[argh(option)]
    pub status: Option<String>,

    /// free-form notes
    #[argh(option)]
    pub notes: Option<String>,
}

#[derive(FromArgs, Debug, PartialEq)]
/// Star (or with --off, unstar) an inspection.
#[argh(subcommand, name = "star-inspection")]
pub struct StarInspectionArgs {
    /// inspection id
    #[argh(positional)]
    pub id: i64,

    /// remove the star
    #[argh(switch)]
    pub off: bool,
}

#[derive(FromArgs, Debug, PartialEq)]
/// Delete an inspection and its locally cached annotations.
#[argh(subcommand, name = "delete-inspection")]
pub struct DeleteInspectionArgs {
    /// transformer number
    #[argh(positional)]
    pub transformer: String,

    /// inspection id
    #[argh(positional)]
    pub id: i64,
}

#[derive(FromArgs, Debug, PartialEq)]
/// Upload the baseline image of a transformer.
#[argh(subcommand, name = "upload-baseline")]
pub struct UploadBaselineArgs {
    /// transformer number
    #[argh(positional)]
    pub transformer: String,

    /// image file
    #[argh(positional)]
    pub file: PathBuf,
}

#[derive(FromArgs, Debug, PartialEq)]
/// Upload the current thermal image of an inspection.
#[argh(subcommand, name = "upload-image")]
pub struct UploadImageArgs {
    /// transformer number
    #[argh(positional)]
    pub transformer: String,

    /// inspection id
    #[argh(positional)]
    pub inspection: String,

    /// image file
    #[argh(positional)]
    pub file: PathBuf,

    /// weather during capture: sunny, cloudy, rainy or windy
    #[argh(option)]
    pub weather: Option<String>,
}

#[derive(FromArgs, Debug, PartialEq)]
/// Ask the backend to export the retraining dataset.
#[argh(subcommand, name = "export-dataset")]
pub struct ExportDatasetArgs {}

#[derive(FromArgs, Debug, PartialEq)]
/// Write the annotation feedback report for every inspection.
#[argh(subcommand, name = "export-feedback")]
pub struct ExportFeedbackArgs {
    /// output file; defaults to annotations_all_<date>.json
    #[argh(option, short = 'o')]
    pub output: Option<PathBuf>,
}

/// Run a catalogue command. `view` is handled by the caller.
pub async fn run<C: Cache>(command: Command, repo: &AnnotationRepository<ApiClient, C>) -> Result<()> {
    let api = repo.gateway();
    match command {
        Command::View(_) => bail!("view must be run by the window"),
        Command::ListTransformers(_) => {
            let transformers = api.list_transformers().await?;
            for t in &transformers {
                println!(
                    "{:<12} {:<10} {:<14} {:<14} {:<8}{}",
                    t.number(),
                    t.pole_no.as_deref().unwrap_or("-"),
                    t.region.as_deref().unwrap_or("-"),
                    t.kind.as_deref().unwrap_or("-"),
                    t.capacity.as_deref().unwrap_or("-"),
                    if t.starred { " *" } else { "" }
                );
            }
            log::info!("{} transformers", transformers.len());
        }
        Command::AddTransformer(args) => {
            let transformer = Transformer {
                transformer_no: Some(args.number),
                pole_no: args.pole,
                region: args.region,
                kind: args.kind,
                capacity: args.capacity,
                location_details: args.location,
                ..Transformer::default()
            };
            validate::transformer(&transformer)?;
            let created = api.create_transformer(&transformer).await?;
            println!("created transformer {}", created.number());
        }
        Command::UpdateTransformer(args) => {
            let mut transformer = api
                .list_transformers()
                .await?
                .into_iter()
                .find(|t| t.number() == args.number)
                .ok_or_else(|| anyhow!("transformer {} not found", args.number))?;
            if args.pole.is_some() {
                transformer.pole_no = args.pole;
            }
            if args.region.is_some() {
                transformer.region = args.region;
            }
            if args.kind.is_some() {
                transformer.kind = args.kind;
            }
            if args.capacity.is_some() {
                transformer.capacity = args.capacity;
            }
            if args.location.is_some() {
                transformer.location_details = args.location;
            }
            validate::transformer(&transformer)?;
            api.update_transformer(&args.number, &transformer).await?;
            println!("updated transformer {}", args.number);
        }
        Command::DeleteTransformer(args) => {
            api.delete_transformer(&args.number).await?;
            println!("deleted transformer {}", args.number);
        }
        Command::StarTransformer(args) => {
            api.set_transformer_starred(&args.number, !args.off).await?;
            println!("{} transformer {}", if args.off { "unstarred" } else { "starred" }, args.number);
        }
        Command::ListInspections(args) => match args.transformer {
            Some(number) => {
                let data = api.transformer_data(&number).await?;
                for i in &data.inspections {
                    println!(
                        "{:>9} {:<18} {:<18} {:<12}{}",
                        i.id,
                        i.inspected_date.as_deref().unwrap_or("-"),
                        i.maintenance_date.as_deref().unwrap_or("-"),
                        i.status.as_deref().unwrap_or("-"),
                        if i.starred { " *" } else { "" }
                    );
                }
            }
            None => {
                for row in api.inspection_table().await? {
                    println!(
                        "{:<12} {:>9} {:<18} {:<18} {:<12}{}",
                        row.transformer_no.as_deref().unwrap_or("-"),
                        row.inspection_no.as_deref().unwrap_or("-"),
                        row.inspected_date,
                        row.maintenance_date,
                        row.status,
                        if row.starred { " *" } else { "" }
                    );
                }
            }
        },
        Command::AddInspection(args) => {
            let status = match args.status.as_deref() {
                Some(raw) => Some(
                    InspectionStatus::parse(raw).ok_or_else(|| anyhow!("unknown inspection status '{raw}'"))?,
                ),
                None => None,
            };
            let request = InspectionReq {
                inspected_at: args.inspected_at,
                maintenance_date: args.maintenance_date,
                status,
                notes: args.notes,
                starred: false,
            };
            let inspection = api.create_inspection(&args.transformer, &request).await?;
            println!("created inspection {:09} for {}", inspection.id, args.transformer);
        }
        Command::StarInspection(args) => {
            let wanted = !args.off;
            let row = api
                .inspection_table()
                .await?
                .into_iter()
                .find(|row| row.inspection_id() == Some(args.id));
            match row {
                Some(mut row) if row.starred != wanted => {
                    api.toggle_inspection_star(&mut row).await?;
                }
                Some(_) => log::debug!("inspection {} already in the wanted star state", args.id),
                None => {
                    api.patch_inspection(args.id, &InspectionPatch::star(wanted)).await?;
                }
            }
            println!("{} inspection {}", if args.off { "unstarred" } else { "starred" }, args.id);
        }
        Command::DeleteInspection(args) => {
            api.delete_inspection(args.id).await?;
            repo.clear(&args.transformer, &args.id.to_string());
            println!("deleted inspection {}", args.id);
        }
        Command::UploadBaseline(args) => {
            let uploader = validate::uploader(repo.user())?;
            let path = validate::upload_file(Some(args.file.as_path()))?;
            let file = UploadFile::from_path(path).with_context(|| format!("reading {}", path.display()))?;
            if api.has_baseline(&args.transformer).await {
                log::info!("replacing the existing baseline of {}", args.transformer);
            }
            api.upload_baseline(&args.transformer, file, uploader, None).await?;
            println!("uploaded baseline for {}", args.transformer);
        }
        Command::UploadImage(args) => {
            let uploader = validate::uploader(repo.user())?;
            let weather = validate::weather(args.weather.as_deref())?;
            let path = validate::upload_file(Some(args.file.as_path()))?;
            let file = UploadFile::from_path(path).with_context(|| format!("reading {}", path.display()))?;
            api.upload_current_image(&args.transformer, &args.inspection, file, uploader, weather, None)
                .await?;
            println!("uploaded image for inspection {}", args.inspection);
        }
        Command::ExportDataset(_) => {
            let result = api.export_dataset().await?;
            println!(
                "exported {} images and {} labels{}",
                result.images_copied,
                result.labels_written,
                result
                    .export_root
                    .map(|root| format!(" to {root}"))
                    .unwrap_or_default()
            );
        }
        Command::ExportFeedback(args) => {
            let rows = api.inspection_table().await?;
            let entries = build_report(api, &rows).await;
            let path = args
                .output
                .unwrap_or_else(|| PathBuf::from(report_file_name(chrono::Local::now().date_naive())));
            write_report(&path, &entries)?;
            println!("wrote {} entries to {}", entries.len(), path.display());
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Result<Cli, argh::EarlyExit> {
        Cli::from_args(&["thermal-inspector"], args)
    }

    #[test]
    fn parses_view() {
        let cli = parse(&["--api-url", "http://h:9", "view", "T-100", "7"]).unwrap();
        assert_eq!(cli.api_url.as_deref(), Some("http://h:9"));
        assert_eq!(
            cli.command,
            Command::View(ViewArgs {
                transformer: "T-100".into(),
                inspection: "7".into()
            })
        );
    }

    #[test]
    fn parses_upload_image_options() {
        let cli = parse(&["upload-image", "T-100", "7", "cur.png", "--weather", "rainy"]).unwrap();
        let Command::UploadImage(args) = cli.command else {
            panic!("wrong command");
        };
        assert_eq!(args.file, PathBuf::from("cur.png"));
        assert_eq!(args.weather.as_deref(), Some("rainy"));
    }

    #[test]
    fn star_switch_and_numeric_id() {
        let cli = parse(&["star-inspection", "42", "--off"]).unwrap();
        assert_eq!(cli.command, Command::StarInspection(StarInspectionArgs { id: 42, off: true }));
        assert!(parse(&["star-inspection", "abc"]).is_err());
        assert!(parse(&[]).is_err());
    }
}
