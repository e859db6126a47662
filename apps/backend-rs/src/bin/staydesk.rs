use std::{path::PathBuf, process::ExitCode};

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use serde_json::Value;
use staydesk::{
    client::{
        Action, ApiClient, ClientError, ClientResult, FileSessionRepository, Session, Store,
    },
    models::{Booking, BookingDraft, BookingId, DateRange, Property, PropertyDraft, PropertyId},
    services::{overlap::has_overlap, revenue::quote_total},
};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "staydesk")]
#[command(about = "Vacation rental dashboard: properties, bookings, calendar and revenue")]
struct Cli {
    /// Backend base URL, including the API prefix
    #[arg(long, env = "STAYDESK_API_URL", default_value = "http://localhost:8000/v1")]
    api_url: String,

    /// Where the signed-in session is kept (defaults to ~/.staydesk/session.json)
    #[arg(long, env = "STAYDESK_SESSION_FILE")]
    session_file: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Sign in and store the session
    SignIn(Credentials),
    /// Create an account
    SignUp(Credentials),
    /// Forget the stored session
    SignOut,
    /// Show the signed-in user
    Whoami,
    #[command(subcommand)]
    Properties(PropertyCommand),
    #[command(subcommand)]
    Bookings(BookingCommand),
    /// Month calendar for a property
    Calendar {
        property_id: PropertyId,
        /// Any day of the month to show (YYYY-MM-DD); defaults to today
        #[arg(long)]
        month: Option<NaiveDate>,
    },
    /// Revenue and guest figures for a property
    Stats {
        property_id: PropertyId,
        /// Any day of the month to compare (YYYY-MM-DD); defaults to today
        #[arg(long)]
        month: Option<NaiveDate>,
    },
}

#[derive(Args)]
struct Credentials {
    #[arg(long)]
    email: String,
    #[arg(long)]
    password: String,
}

#[derive(Subcommand)]
enum PropertyCommand {
    List,
    Show { property_id: PropertyId },
    Create(PropertyFields),
    Update {
        property_id: PropertyId,
        #[command(flatten)]
        fields: PropertyFields,
    },
    /// Deletes the property and all of its bookings
    Delete { property_id: PropertyId },
}

#[derive(Args)]
struct PropertyFields {
    #[arg(long)]
    name: String,
    #[arg(long)]
    location: String,
}

#[derive(Subcommand)]
enum BookingCommand {
    List {
        #[arg(long)]
        property_id: Option<PropertyId>,
    },
    Show { booking_id: BookingId },
    Create(BookingFields),
    Update {
        booking_id: BookingId,
        #[command(flatten)]
        fields: BookingFields,
    },
    Delete { booking_id: BookingId },
}

#[derive(Args)]
struct BookingFields {
    #[arg(long)]
    property_id: PropertyId,
    /// Guest name
    #[arg(long)]
    name: String,
    #[arg(long)]
    start: NaiveDate,
    #[arg(long)]
    end: NaiveDate,
    #[arg(long)]
    price_per_day: f64,
}

impl BookingFields {
    fn into_draft(self) -> ClientResult<BookingDraft> {
        let range = DateRange::new(self.start, self.end)
            .map_err(|error| ClientError::Invalid(error.to_string()))?;
        if self.name.trim().is_empty() {
            return Err(ClientError::Invalid("Guest name is required".to_string()));
        }
        if self.price_per_day.is_nan() || self.price_per_day <= 0.0 {
            return Err(ClientError::Invalid(
                "Price per day must be greater than zero".to_string(),
            ));
        }
        Ok(BookingDraft {
            property_id: self.property_id,
            guest_name: self.name.trim().to_string(),
            start_date: range.start,
            end_date: range.end,
            price_per_day: self.price_per_day,
        })
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            eprintln!("error: {error}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> ClientResult<()> {
    let session_file = cli.session_file.unwrap_or_else(default_session_file);
    let mut store = Store::open(FileSessionRepository::new(session_file))?;
    let api = ApiClient::new(&cli.api_url)?;

    match cli.command {
        Command::SignIn(credentials) => {
            let login = api.sign_in(&credentials.email, &credentials.password).await?;
            let session = Session::signed_in(&login.user, &login.access_token);
            let state = store.dispatch(Action::SignedIn(session))?;
            println!("Signed in as {}", state.auth.email);
        }
        Command::SignUp(credentials) => {
            api.sign_up(&credentials.email, &credentials.password).await?;
            println!("Account created for {}. Sign in to continue.", credentials.email);
        }
        Command::SignOut => {
            store.dispatch(Action::SignedOut)?;
            println!("Signed out");
        }
        Command::Whoami => match store.session() {
            Some(session) => println!("{} (id {})", session.email, session.id),
            None => println!("Not signed in"),
        },
        Command::Properties(command) => {
            let api = authorized(&store, api)?;
            run_properties(&mut store, &api, command).await?;
        }
        Command::Bookings(command) => {
            let api = authorized(&store, api)?;
            run_bookings(&mut store, &api, command).await?;
        }
        Command::Calendar { property_id, month } => {
            let api = authorized(&store, api)?;
            store.dispatch(Action::PropertySelected(Some(property_id)))?;
            let calendar = api.calendar(property_id, month).await?;
            print_calendar(&calendar);
        }
        Command::Stats { property_id, month } => {
            let api = authorized(&store, api)?;
            store.dispatch(Action::PropertySelected(Some(property_id)))?;
            let stats = api.stats(property_id, month).await?;
            print_stats(&stats);
        }
    }
    Ok(())
}

fn authorized<R>(store: &Store<R>, api: ApiClient) -> ClientResult<ApiClient>
where
    R: staydesk::client::SessionRepository,
{
    let session = store.session().ok_or(ClientError::NotSignedIn)?;
    Ok(api.with_token(Some(session.token.clone())))
}

async fn run_properties(
    store: &mut Store<FileSessionRepository>,
    api: &ApiClient,
    command: PropertyCommand,
) -> ClientResult<()> {
    match command {
        PropertyCommand::List => {
            store.dispatch(Action::PropertiesRequested)?;
            let state = match api.list_properties().await {
                Ok(properties) => store.dispatch(Action::PropertiesLoaded(properties))?,
                Err(error) => {
                    store.dispatch(Action::PropertiesFailed(error.to_string()))?;
                    return Err(error);
                }
            };
            if state.properties.properties.is_empty() {
                println!("No properties yet");
            }
            for property in &state.properties.properties {
                print_property(property);
            }
        }
        PropertyCommand::Show { property_id } => {
            let property = api.get_property(property_id).await?;
            let state = store.dispatch(Action::PropertyLoaded(property))?;
            if let Some(property) = &state.properties.selected_property {
                print_property(property);
            }
        }
        PropertyCommand::Create(fields) => {
            let created = api.create_property(&property_draft(fields)).await?;
            store.dispatch(Action::PropertySaved)?;
            println!("Created property #{} {}", created.id, created.name);
        }
        PropertyCommand::Update {
            property_id,
            fields,
        } => {
            let updated = api
                .update_property(property_id, &property_draft(fields))
                .await?;
            store.dispatch(Action::PropertySaved)?;
            println!("Updated property #{} {}", updated.id, updated.name);
        }
        PropertyCommand::Delete { property_id } => {
            api.delete_property(property_id).await?;
            store.dispatch(Action::PropertyRemoved(property_id))?;
            println!("Deleted property #{property_id} and its bookings");
        }
    }
    Ok(())
}

async fn run_bookings(
    store: &mut Store<FileSessionRepository>,
    api: &ApiClient,
    command: BookingCommand,
) -> ClientResult<()> {
    match command {
        BookingCommand::List { property_id } => {
            store.dispatch(Action::BookingsRequested)?;
            let state = match api.list_bookings(property_id).await {
                Ok(bookings) => store.dispatch(Action::BookingsLoaded(bookings))?,
                Err(error) => {
                    store.dispatch(Action::BookingsFailed(error.to_string()))?;
                    return Err(error);
                }
            };
            if state.bookings.bookings.is_empty() {
                println!("No bookings");
            }
            for booking in &state.bookings.bookings {
                print_booking(booking);
            }
        }
        BookingCommand::Show { booking_id } => {
            let booking = api.get_booking(booking_id).await?;
            print_booking(&booking);
            store.dispatch(Action::BookingStored(booking))?;
        }
        BookingCommand::Create(fields) => {
            let draft = fields.into_draft()?;
            check_availability(api, &draft, None).await?;
            let created = api.create_booking(&draft).await?;
            println!("Created booking #{}", created.id);
            print_booking(&created);
            store.dispatch(Action::BookingStored(created))?;
        }
        BookingCommand::Update { booking_id, fields } => {
            let draft = fields.into_draft()?;
            check_availability(api, &draft, Some(booking_id)).await?;
            let updated = api.update_booking(booking_id, &draft).await?;
            println!("Updated booking #{}", updated.id);
            print_booking(&updated);
            store.dispatch(Action::BookingStored(updated))?;
        }
        BookingCommand::Delete { booking_id } => {
            api.delete_booking(booking_id).await?;
            store.dispatch(Action::BookingRemoved(booking_id))?;
            println!("Deleted booking #{booking_id}");
        }
    }
    Ok(())
}

/// Runs the overlap check locally before submitting, then prints the quote.
async fn check_availability(
    api: &ApiClient,
    draft: &BookingDraft,
    exclude_booking_id: Option<BookingId>,
) -> ClientResult<()> {
    let existing = api.list_bookings(Some(draft.property_id)).await?;
    if has_overlap(draft.range(), draft.property_id, exclude_booking_id, &existing) {
        return Err(ClientError::Invalid(
            "The selected dates overlap with an existing booking.".to_string(),
        ));
    }
    println!(
        "{} night(s) at {} = {}",
        draft.range().days(),
        format_usd(draft.price_per_day),
        format_usd(quote_total(draft.range(), draft.price_per_day))
    );
    Ok(())
}

fn property_draft(fields: PropertyFields) -> PropertyDraft {
    PropertyDraft {
        name: fields.name.trim().to_string(),
        location: fields.location.trim().to_string(),
    }
}

fn print_property(property: &Property) {
    println!("#{:<4} {:<30} {}", property.id, property.name, property.location);
}

fn print_booking(booking: &Booking) {
    println!(
        "#{:<4} property {:<4} {:<24} {} -> {}  {}/day  total {}",
        booking.id,
        booking.property_id,
        booking.guest_name,
        booking.start_date,
        booking.end_date,
        format_usd(booking.price_per_day),
        format_usd(quote_total(booking.range(), booking.price_per_day))
    );
}

fn print_calendar(calendar: &Value) {
    println!("{}", calendar["label"].as_str().unwrap_or_default());
    println!(" Su  Mo  Tu  We  Th  Fr  Sa");

    for week in calendar["weeks"].as_array().into_iter().flatten() {
        let cells = week
            .as_array()
            .into_iter()
            .flatten()
            .map(render_day)
            .collect::<Vec<_>>();
        println!("{}", cells.join(""));
    }

    let bookings = calendar["bookings"].as_array().cloned().unwrap_or_default();
    if !bookings.is_empty() {
        println!();
    }
    for row in bookings {
        if let Ok(booking) = serde_json::from_value::<Booking>(row) {
            print_booking(&booking);
        }
    }
}

/// ` 12 ` plain, `*12 ` booked, `[12]` today; days outside the month are blank.
fn render_day(day: &Value) -> String {
    if !day["inMonth"].as_bool().unwrap_or(false) {
        return "    ".to_string();
    }
    let number = day["date"]
        .as_str()
        .and_then(|raw| raw.get(8..10))
        .unwrap_or("??");
    let booked = day["bookingIds"]
        .as_array()
        .is_some_and(|ids| !ids.is_empty());

    if day["isToday"].as_bool().unwrap_or(false) {
        format!("[{number}]")
    } else if booked {
        format!("*{number} ")
    } else {
        format!(" {number} ")
    }
}

fn print_stats(stats: &Value) {
    let amount = |value: &Value| format_usd(value.as_f64().unwrap_or(0.0));
    let comparison = |label: &str, value: &Value| {
        println!(
            "{label:<22} {:>14}   previous {:>14}   change {}",
            amount(&value["current"]),
            amount(&value["previous"]),
            value["change"].as_str().unwrap_or("0%")
        );
    };

    println!("Guests this month      {}", stats["guestsThisMonth"]);
    comparison("Revenue this month", &stats["thisMonth"]);
    comparison("Revenue this year", &stats["thisYear"]);
    comparison(
        stats["selectedMonthLabel"].as_str().unwrap_or("Selected month"),
        &stats["selectedMonthRevenue"],
    );
}

/// `1234.5` -> `$1,234.50`.
fn format_usd(amount: f64) -> String {
    let cents = (amount.abs() * 100.0).round() as u64;
    let digits = (cents / 100).to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (index, digit) in digits.chars().enumerate() {
        if index > 0 && (digits.len() - index) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }
    let sign = if amount < 0.0 && cents > 0 { "-" } else { "" };
    format!("{sign}${grouped}.{:02}", cents % 100)
}

fn default_session_file() -> PathBuf {
    std::env::var_os("HOME")
        .map(PathBuf::from)
        .unwrap_or_default()
        .join(".staydesk")
        .join("session.json")
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();
}
