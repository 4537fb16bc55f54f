use std::future::Future;
use std::path::PathBuf;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use serde_json::Value;
use tracing_subscriber::EnvFilter;

mod api;
mod client;
mod config;
mod error;
mod files;
mod metrics;
mod models;
mod report;
mod search;
mod session;
mod store;

use crate::config::ConnectionConfig;
use crate::error::ApiResult;
use crate::metrics::MetricsEngine;
use crate::models::{Credentials, DashboardMetrics, Period};
use crate::search::{SearchFilter, DEFAULT_SEARCH_KEY};
use crate::session::AuthSession;
use crate::store::{CollectionStore, PaymentSummary};

#[derive(Parser)]
#[command(name = "booking-admin")]
#[command(about = "Admin console for the booking marketplace backend", long_about = None)]
struct Cli {
    #[command(flatten)]
    connection: ConnectionConfig,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Sign in and store the session token
    Login {
        #[arg(long)]
        email: String,
        #[arg(long, env = "ADMIN_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Forget the stored session token
    Logout,
    /// Confirm a two-factor PIN
    VerifyPin {
        #[arg(long)]
        email: String,
        #[arg(long)]
        pin: String,
        /// Token from the login step; defaults to the stored one
        #[arg(long)]
        token: Option<String>,
    },
    /// Send a password reset email
    ForgotPassword {
        #[arg(long)]
        email: String,
    },
    /// Set a new password using a reset token
    ResetPassword {
        #[arg(long)]
        token: String,
        #[arg(long, env = "ADMIN_NEW_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Live user metrics from the backend
    Dashboard {
        #[command(flatten)]
        output: MetricsOutput,
        /// Also print the backend's own aggregate stats
        #[arg(long)]
        server_stats: bool,
    },
    /// User metrics from an exported .json or .csv file
    Metrics {
        #[arg(long)]
        file: PathBuf,
        #[command(flatten)]
        output: MetricsOutput,
    },
    /// Manage customers
    Customers {
        #[command(subcommand)]
        action: CustomerAction,
    },
    /// Manage service providers
    Providers {
        #[command(subcommand)]
        action: ProviderAction,
    },
    /// Manage bookings
    Bookings {
        #[command(subcommand)]
        action: BookingAction,
    },
    /// Manage payments
    Payments {
        #[command(subcommand)]
        action: PaymentAction,
    },
    /// Manage service categories and subcategories
    Categories {
        #[command(subcommand)]
        action: CategoryAction,
    },
    /// Platform settings
    Settings {
        #[command(subcommand)]
        action: SettingsAction,
    },
}

#[derive(Args)]
struct MetricsOutput {
    /// today, this-week or this-month
    #[arg(long, default_value = "today")]
    period: Period,
    /// Print the raw metrics as JSON
    #[arg(long)]
    json: bool,
    /// Also write a markdown report
    #[arg(long)]
    out: Option<PathBuf>,
}

#[derive(Args)]
struct SearchArgs {
    /// Case-insensitive substring to look for
    #[arg(long)]
    search: Option<String>,
    /// Field the search applies to
    #[arg(long, default_value = DEFAULT_SEARCH_KEY)]
    search_key: String,
}

#[derive(Args)]
struct ListArgs {
    #[arg(long, default_value = api::ALL_STATUSES)]
    status: String,
    #[command(flatten)]
    search: SearchArgs,
}

#[derive(Subcommand)]
enum CustomerAction {
    List(ListArgs),
    Add {
        #[arg(long, value_parser = parse_json)]
        data: Value,
    },
    SetStatus {
        #[arg(long)]
        email: String,
        #[arg(long)]
        status: String,
    },
    Delete {
        #[arg(long)]
        id: String,
    },
}

#[derive(Subcommand)]
enum ProviderAction {
    List(ListArgs),
    /// Services offered by one provider
    Services {
        #[arg(long)]
        id: String,
    },
    /// Register a provider from form fields
    Add {
        /// KEY=VALUE, repeatable
        #[arg(long = "field", value_parser = parse_field)]
        fields: Vec<(String, String)>,
    },
    SetStatus {
        #[arg(long)]
        email: String,
        #[arg(long)]
        status: String,
    },
    Delete {
        #[arg(long)]
        id: String,
    },
}

#[derive(Subcommand)]
enum BookingAction {
    List(ListArgs),
    Show {
        #[arg(long)]
        id: String,
    },
    Create {
        #[arg(long, value_parser = parse_json)]
        data: Value,
    },
    Update {
        #[arg(long)]
        id: String,
        #[arg(long, value_parser = parse_json)]
        data: Value,
    },
    SetStatus {
        #[arg(long)]
        id: String,
        #[arg(long)]
        status: String,
    },
    Delete {
        #[arg(long)]
        id: String,
    },
}

#[derive(Subcommand)]
enum PaymentAction {
    List(ListArgs),
    Show {
        #[arg(long)]
        id: String,
    },
    Refund {
        #[arg(long)]
        id: String,
    },
    Create {
        #[arg(long, value_parser = parse_json)]
        data: Value,
    },
    Update {
        #[arg(long)]
        id: String,
        #[arg(long, value_parser = parse_json)]
        data: Value,
    },
    Delete {
        #[arg(long)]
        id: String,
    },
    /// Completed/pending counts and revenue
    Summary,
}

#[derive(Subcommand)]
enum CategoryAction {
    List(SearchArgs),
    Add {
        #[arg(long, value_parser = parse_json)]
        data: Value,
    },
    Update {
        #[arg(long)]
        id: String,
        #[arg(long, value_parser = parse_json)]
        data: Value,
    },
    Delete {
        #[arg(long)]
        id: String,
    },
    Subcategories {
        #[arg(long)]
        category_id: String,
        #[command(flatten)]
        search: SearchArgs,
    },
    AddSubcategory {
        #[arg(long)]
        category_id: String,
        #[arg(long, value_parser = parse_json)]
        data: Value,
    },
    UpdateSubcategory {
        #[arg(long)]
        id: String,
        #[arg(long, value_parser = parse_json)]
        data: Value,
    },
    DeleteSubcategory {
        #[arg(long)]
        id: String,
    },
}

#[derive(Subcommand)]
enum SettingsAction {
    Show,
    Update {
        #[arg(long, value_parser = parse_json)]
        data: Value,
    },
}

fn parse_json(raw: &str) -> Result<Value, String> {
    serde_json::from_str(raw).map_err(|err| format!("invalid JSON: {err}"))
}

fn parse_field(raw: &str) -> Result<(String, String), String> {
    raw.split_once('=')
        .map(|(key, value)| (key.to_string(), value.to_string()))
        .ok_or_else(|| format!("expected KEY=VALUE, got `{raw}`"))
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn print_filtered(items: &[Value], args: &SearchArgs) -> anyhow::Result<()> {
    let mut filter = SearchFilter::with_key(items, &args.search_key);
    if let Some(ref query) = args.search {
        filter.set_query(query.as_str());
    }
    print_json(&filter.filtered_view())
}

async fn list<F>(fetch: F, args: &SearchArgs) -> anyhow::Result<()>
where
    F: Future<Output = ApiResult<Vec<Value>>>,
{
    let mut store = CollectionStore::new();
    load_or_report(&mut store, fetch, "records").await?;
    print_filtered(store.items(), args)
}

/// Fails with the message the store recorded for the failed load.
async fn load_or_report<F>(
    store: &mut CollectionStore,
    fetch: F,
    what: &str,
) -> anyhow::Result<()>
where
    F: Future<Output = ApiResult<Vec<Value>>>,
{
    let outcome = store.load(fetch).await.map(|_| ());
    if let Err(err) = outcome {
        let message = format!(
            "failed to load {what}: {}",
            store.error().unwrap_or("unknown error")
        );
        return Err(err).context(message);
    }
    Ok(())
}

fn emit_metrics(
    output: &MetricsOutput,
    metrics: &DashboardMetrics,
    category_count: Option<usize>,
) -> anyhow::Result<()> {
    let generated_at = chrono::Local::now().naive_local();
    let report = report::build_report(&output.period, generated_at, metrics, category_count);

    if output.json {
        print_json(metrics)?;
    } else {
        print!("{report}");
    }

    if let Some(ref out) = output.out {
        std::fs::write(out, &report)
            .with_context(|| format!("failed to write {}", out.display()))?;
        eprintln!("Report written to {}.", out.display());
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .init();

    let cli = Cli::parse();
    let connection = &cli.connection;

    match cli.command {
        Commands::Login { email, password } => {
            let client = connection.client()?;
            let mut session = AuthSession::restore(connection.token_store())
                .context("failed to read the stored session")?;
            if let Err(err) = session.login(&client, &Credentials { email, password }).await {
                let message = format!("login failed: {}", session.error().unwrap_or("unknown error"));
                return Err(err).context(message);
            }

            let who = session
                .user()
                .and_then(|user| user.get("email"))
                .and_then(Value::as_str)
                .unwrap_or("unknown user");
            let role = if session.is_admin() { "admin" } else { "staff" };
            println!("Signed in as {who} ({role}).");
        }
        Commands::Logout => {
            let mut session = AuthSession::restore(connection.token_store())
                .context("failed to read the stored session")?;
            if !session.is_authenticated() {
                println!("No active session.");
                return Ok(());
            }
            session.logout().context("failed to remove the session token")?;
            println!("Signed out.");
        }
        Commands::VerifyPin { email, pin, token } => {
            let client = connection.client()?;
            let bearer = match token {
                Some(token) => token,
                None => client
                    .token()
                    .map(str::to_string)
                    .context("no stored token; run `login` first or pass --token")?,
            };
            let response = api::verify_2fa_pin(&client, &email, &pin, &bearer).await?;

            if let Some(token) = response.get("token").and_then(Value::as_str) {
                let mut session = AuthSession::restore(connection.token_store())
                    .context("failed to read the stored session")?;
                session
                    .set_token(token.to_string())
                    .context("failed to store the session token")?;
            }
            print_json(&response)?;
        }
        Commands::ForgotPassword { email } => {
            let client = connection.client()?;
            print_json(&api::forgot_password(&client, &email).await?)?;
        }
        Commands::ResetPassword { token, password } => {
            let client = connection.client()?;
            print_json(&api::reset_password(&client, &token, &password).await?)?;
        }
        Commands::Dashboard {
            output,
            server_stats,
        } => {
            let client = connection.client()?;
            let data = api::fetch_dashboard_data(&client)
                .await
                .context("failed to load dashboard data")?;

            let mut engine = MetricsEngine::default();
            engine.set_period(output.period.clone());
            let metrics = engine.compute_metrics(&data.users());
            emit_metrics(&output, &metrics, Some(data.categories.len()))?;

            if server_stats {
                let stats = api::fetch_dashboard_stats(&client, engine.period()).await?;
                print_json(&stats)?;
            }
        }
        Commands::Metrics { file, output } => {
            let users = files::load_users(&file)?;
            let metrics = MetricsEngine::new(output.period.clone()).compute_metrics(&users);
            emit_metrics(&output, &metrics, None)?;
        }
        Commands::Customers { action } => {
            let client = connection.client()?;
            match action {
                CustomerAction::List(args) => {
                    list(api::fetch_customers(&client, &args.status), &args.search).await?
                }
                CustomerAction::Add { data } => {
                    print_json(&api::add_customer(&client, &data).await?)?
                }
                CustomerAction::SetStatus { email, status } => print_json(
                    &api::update_customer_status(&client, &email, &status).await?,
                )?,
                CustomerAction::Delete { id } => {
                    print_json(&api::delete_user(&client, &id).await?)?
                }
            }
        }
        Commands::Providers { action } => {
            let client = connection.client()?;
            match action {
                ProviderAction::List(args) => {
                    list(api::fetch_providers(&client, &args.status), &args.search).await?
                }
                ProviderAction::Services { id } => {
                    print_json(&api::fetch_provider_services(&client, &id).await?)?
                }
                ProviderAction::Add { fields } => {
                    print_json(&api::add_provider(&client, &fields).await?)?
                }
                ProviderAction::SetStatus { email, status } => print_json(
                    &api::update_provider_status(&client, &email, &status).await?,
                )?,
                ProviderAction::Delete { id } => {
                    print_json(&api::delete_user(&client, &id).await?)?
                }
            }
        }
        Commands::Bookings { action } => {
            let client = connection.client()?;
            match action {
                BookingAction::List(args) => {
                    list(api::fetch_bookings(&client, &args.status), &args.search).await?
                }
                BookingAction::Show { id } => {
                    print_json(&api::fetch_booking(&client, &id).await?)?
                }
                BookingAction::Create { data } => {
                    print_json(&api::create_booking(&client, &data).await?)?
                }
                BookingAction::Update { id, data } => {
                    print_json(&api::update_booking(&client, &id, &data).await?)?
                }
                BookingAction::SetStatus { id, status } => {
                    print_json(&api::update_booking_status(&client, &id, &status).await?)?
                }
                BookingAction::Delete { id } => {
                    print_json(&api::delete_booking(&client, &id).await?)?
                }
            }
        }
        Commands::Payments { action } => {
            let client = connection.client()?;
            match action {
                PaymentAction::List(args) => {
                    list(api::fetch_payments(&client, &args.status), &args.search).await?
                }
                PaymentAction::Show { id } => {
                    print_json(&api::fetch_payment(&client, &id).await?)?
                }
                PaymentAction::Refund { id } => {
                    print_json(&api::refund_payment(&client, &id).await?)?
                }
                PaymentAction::Create { data } => {
                    print_json(&api::create_payment(&client, &data).await?)?
                }
                PaymentAction::Update { id, data } => {
                    print_json(&api::update_payment(&client, &id, &data).await?)?
                }
                PaymentAction::Delete { id } => {
                    print_json(&api::delete_payment(&client, &id).await?)?
                }
                PaymentAction::Summary => {
                    let mut store = CollectionStore::new();
                    let fetch = api::fetch_payments(&client, api::ALL_STATUSES);
                    load_or_report(&mut store, fetch, "payments").await?;
                    print_json(&PaymentSummary::from_store(&store))?;
                }
            }
        }
        Commands::Categories { action } => {
            let client = connection.client()?;
            match action {
                CategoryAction::List(args) => list(api::fetch_categories(&client), &args).await?,
                CategoryAction::Add { data } => {
                    print_json(&api::add_category(&client, &data).await?)?
                }
                CategoryAction::Update { id, data } => {
                    print_json(&api::update_category(&client, &id, &data).await?)?
                }
                CategoryAction::Delete { id } => {
                    print_json(&api::delete_category(&client, &id).await?)?
                }
                CategoryAction::Subcategories {
                    category_id,
                    search,
                } => list(api::fetch_subcategories(&client, &category_id), &search).await?,
                CategoryAction::AddSubcategory { category_id, data } => {
                    print_json(&api::add_subcategory(&client, &category_id, &data).await?)?
                }
                CategoryAction::UpdateSubcategory { id, data } => {
                    print_json(&api::update_subcategory(&client, &id, &data).await?)?
                }
                CategoryAction::DeleteSubcategory { id } => {
                    print_json(&api::delete_subcategory(&client, &id).await?)?
                }
            }
        }
        Commands::Settings { action } => {
            let client = connection.client()?;
            match action {
                SettingsAction::Show => print_json(&api::fetch_settings(&client).await?)?,
                SettingsAction::Update { data } => {
                    print_json(&api::update_settings(&client, &data).await?)?
                }
            }
        }
    }

    Ok(())
}
