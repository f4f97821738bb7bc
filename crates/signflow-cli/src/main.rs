//! Signflow CLI: operate the sequential signing workflow from the command line.
//!
//! Reads configuration from the environment (`DATABASE_URL`, `UPLOAD_DIR`, ...).
//! The acting user is given with `--as <USER_ID>` or `SIGNFLOW_USER`.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clap::{Parser, Subcommand};
use serde_json::json;
use signflow_cli::{
    content_type_for, print_json, roster_table,
    setup::{connect_database, run_migrations, App},
};
use signflow_core::{
    models::{DocumentStatus, UserRole, AUDIT_ENTITY_DOCUMENT},
    validation::validate_rejection_reason,
    AppError, Config,
};
use signflow_db::UserDirectory;
use signflow_infra::{init_telemetry, log_error, shutdown_telemetry, ErrorResponse};
use signflow_services::{UploadOptions, UploadedFile};
use uuid::Uuid;

#[derive(Parser)]
#[command(name = "signflow", about = "Sequential PDF signature workflow")]
struct Cli {
    /// Acting user id
    #[arg(long = "as", global = true, env = "SIGNFLOW_USER", value_name = "USER_ID")]
    acting_as: Option<Uuid>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Apply pending database migrations
    Migrate,
    /// Show the acting user
    Whoami,
    /// User directory
    User {
        #[command(subcommand)]
        sub: UserCommands,
    },
    /// Upload a PDF; several files are merged into one document
    Upload {
        #[arg(required = true)]
        files: Vec<PathBuf>,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        description: Option<String>,
        /// Sub-folder label (defaults to the title)
        #[arg(long)]
        group: Option<String>,
    },
    /// Assign signers in signing order
    Assign {
        document_id: Uuid,
        #[arg(required = true)]
        signers: Vec<Uuid>,
    },
    /// Sign a document
    Sign {
        document_id: Uuid,
        /// Signature payload stored with the ledger entry
        #[arg(long, default_value = "signed")]
        data: String,
    },
    /// Reject a document with a reason
    Reject { document_id: Uuid, reason: String },
    /// Archive a document
    Archive { document_id: Uuid },
    /// Delete a document and its file
    Delete { document_id: Uuid },
    /// Document details, signer roster and whether you may act
    Status {
        document_id: Uuid,
        /// Print the roster as a table instead of JSON
        #[arg(long)]
        table: bool,
    },
    /// All documents, optionally filtered by status
    Documents {
        #[arg(long)]
        status: Option<DocumentStatus>,
    },
    /// Documents you uploaded, with progress counts
    Mine,
    /// Documents waiting for your signature
    Pending,
    /// Documents you signed
    Signed,
    /// Rejected documents
    Rejected {
        /// Only those you rejected yourself
        #[arg(long)]
        by_me: bool,
    },
    /// Ledger entries of a document, or yours when no document is given
    Signatures { document_id: Option<Uuid> },
    /// Users you can pick as signers
    AvailableSigners,
    /// Audit trail of a document
    Audit { document_id: Uuid },
}

#[derive(Subcommand)]
enum UserCommands {
    /// Create a user
    Create {
        name: String,
        email: String,
        #[arg(long)]
        admin: bool,
    },
    /// List users (administrators only)
    List,
}

async fn run(app: &App, acting_as: Option<Uuid>, command: Commands) -> Result<(), AppError> {
    // Bootstrap commands run before any user exists.
    let acting = match command {
        Commands::Migrate
        | Commands::User {
            sub: UserCommands::Create { .. },
        } => None,
        _ => app.acting_user(acting_as).await?,
    };

    match command {
        Commands::Migrate => {
            run_migrations(&app.pool).await?;
            print_json(&json!({ "success": true }))?;
        }
        Commands::Whoami => print_json(&app.inbox.me(acting).await?)?,
        Commands::User { sub } => match sub {
            UserCommands::Create { name, email, admin } => {
                let role = if admin { UserRole::Admin } else { UserRole::User };
                let user = app.users.create_user(name.trim(), email.trim(), role).await?;
                print_json(&user)?;
            }
            UserCommands::List => print_json(&app.inbox.users(acting).await?)?,
        },
        Commands::Upload {
            files,
            title,
            description,
            group,
        } => {
            let mut uploaded = Vec::with_capacity(files.len());
            for path in &files {
                let data = tokio::fs::read(path).await?;
                let file_name = path
                    .file_name()
                    .and_then(|n| n.to_str())
                    .unwrap_or_default()
                    .to_string();
                uploaded.push(UploadedFile {
                    file_name,
                    content_type: content_type_for(path).to_string(),
                    data,
                });
            }
            let options = UploadOptions {
                title,
                description,
                group,
            };
            let document = if uploaded.len() == 1 {
                let file = uploaded.remove(0);
                app.uploads.upload(acting, file, options).await?
            } else {
                app.uploads.upload_merged(acting, uploaded, options).await?
            };
            print_json(&document)?;
        }
        Commands::Assign {
            document_id,
            signers,
        } => {
            let success = app
                .engine
                .assign_signers(document_id, &signers, acting)
                .await?;
            print_json(&json!({ "success": success }))?;
        }
        Commands::Sign { document_id, data } => {
            let signature = app.engine.sign(document_id, &data, acting).await?;
            print_json(&signature)?;
        }
        Commands::Reject {
            document_id,
            reason,
        } => {
            validate_rejection_reason(&reason, app.config.min_rejection_reason_len())?;
            let success = app.engine.reject(document_id, &reason, acting).await?;
            print_json(&json!({ "success": success }))?;
        }
        Commands::Archive { document_id } => {
            let success = app.engine.archive_document(document_id, acting).await?;
            print_json(&json!({ "success": success }))?;
        }
        Commands::Delete { document_id } => {
            let success = app.engine.delete_document(document_id, acting).await?;
            print_json(&json!({ "success": success }))?;
        }
        Commands::Status { document_id, table } => {
            let document = app.inbox.document(document_id, acting).await?;
            let signers = app.inbox.signers(document_id, acting).await?;
            if table {
                println!("{} [{}]", document.title, document.status);
                println!("{}", roster_table(&signers));
            } else {
                let can_act = match app.engine.can_act(document_id, acting).await {
                    Ok(check) => Some(check),
                    Err(AppError::NotAssigned) => None,
                    Err(e) => return Err(e),
                };
                print_json(&json!({
                    "document": document,
                    "signers": signers,
                    "can_act": can_act,
                }))?;
            }
        }
        Commands::Documents { status } => match status {
            Some(status) => print_json(&app.inbox.documents_by_status(status, acting).await?)?,
            None => print_json(&app.inbox.all_documents(acting).await?)?,
        },
        Commands::Mine => print_json(&app.inbox.my_documents(acting).await?)?,
        Commands::Pending => print_json(&app.inbox.pending_documents(acting).await?)?,
        Commands::Signed => print_json(&app.inbox.signed_documents(acting).await?)?,
        Commands::Rejected { by_me } => {
            if by_me {
                print_json(&app.inbox.rejected_by_me(acting).await?)?;
            } else {
                print_json(&app.inbox.rejected_by_others(acting).await?)?;
            }
        }
        Commands::Signatures { document_id } => match document_id {
            Some(id) => print_json(&app.inbox.signatures(id, acting).await?)?,
            None => print_json(&app.inbox.my_signatures(acting).await?)?,
        },
        Commands::AvailableSigners => print_json(&app.inbox.available_signers(acting).await?)?,
        Commands::Audit { document_id } => {
            let acting = acting.ok_or(AppError::NotAuthenticated)?;
            let document = app.inbox.document(document_id, Some(acting)).await?;
            if !acting.can_manage(document.uploaded_by) {
                return Err(AppError::Forbidden(
                    "Only the uploader or an administrator can read the audit trail".to_string(),
                ));
            }
            let records = app
                .audit
                .list_for_entity(AUDIT_ENTITY_DOCUMENT, document_id)
                .await?;
            print_json(&records)?;
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let config = Config::from_env().context("Failed to load configuration")?;
    init_telemetry(config.log_format())?;

    let cli = Cli::parse();
    let pool = connect_database(&config).await?;

    let is_production = config.is_production();
    let app = App::build(config, pool).await?;
    let result = run(&app, cli.acting_as, cli.command).await;
    shutdown_telemetry();

    match result {
        Ok(()) => Ok(ExitCode::SUCCESS),
        Err(e) => {
            log_error(&e);
            let body = ErrorResponse::from_error(&e, is_production);
            eprintln!(
                "{}",
                serde_json::to_string_pretty(&body).unwrap_or_else(|_| e.to_string())
            );
            Ok(ExitCode::from(ErrorResponse::exit_code(&e) as u8))
        }
    }
}
