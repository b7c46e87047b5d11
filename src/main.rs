//! Interactive shell for the assistant.
//!
//! Loads the Google token once, wires each collaborator up as a
//! `Capability`, starts the scheduled-send poller and runs a stdin REPL
//! until exit.

use std::io::{self, BufRead, Write};
use std::sync::Arc;

use deskmate::config::{AssistantConfig, Capability};
use deskmate::processor::email::Confirmer;
use deskmate::processor::Assistant;
use deskmate::scheduler::EmailScheduler;
use deskmate::services::calendar::GoogleCalendar;
use deskmate::services::drafter::TemplateDrafter;
use deskmate::services::gmail::GmailTransport;
use deskmate::services::google::GoogleAuth;
use deskmate::services::tasks::GoogleTasks;
use deskmate::services::{CalendarStore, MailTransport, TaskStore};

/// Asks on stdout, reads the answer from stdin. Anything but y/yes is a no.
struct StdinConfirmer;

impl Confirmer for StdinConfirmer {
    fn confirm(&self, prompt: &str) -> bool {
        print!("{}", prompt);
        let _ = io::stdout().flush();
        let mut answer = String::new();
        if io::stdin().lock().read_line(&mut answer).is_err() {
            return false;
        }
        matches!(answer.trim().to_lowercase().as_str(), "y" | "yes")
    }
}

struct Collaborators {
    tasks: Capability<dyn TaskStore>,
    calendar: Capability<dyn CalendarStore>,
    mail: Capability<dyn MailTransport>,
}

fn connect() -> Collaborators {
    match GoogleAuth::load() {
        Ok(auth) => {
            let auth = Arc::new(auth);
            Collaborators {
                tasks: Capability::Available(Arc::new(GoogleTasks::new(Arc::clone(&auth)))),
                calendar: Capability::Available(Arc::new(GoogleCalendar::new(Arc::clone(&auth)))),
                mail: Capability::Available(Arc::new(GmailTransport::new(auth))),
            }
        }
        Err(e) => {
            log::warn!("Google account not connected: {}", e);
            let reason = e.to_string();
            Collaborators {
                tasks: Capability::Unavailable(reason.clone()),
                calendar: Capability::Unavailable(reason.clone()),
                mail: Capability::Unavailable(reason),
            }
        }
    }
}

fn status_label(available: bool) -> &'static str {
    if available {
        "Available"
    } else {
        "NOT Available"
    }
}

#[tokio::main]
async fn main() {
    env_logger::init();

    let config = AssistantConfig::default();
    let collaborators = connect();

    println!("\nPersonal Assistant - Module Status:");
    println!("  Tasks: {}", status_label(collaborators.tasks.is_available()));
    println!("  Email: {}", status_label(collaborators.mail.is_available()));
    println!(
        "  Calendar: {}",
        status_label(collaborators.calendar.is_available())
    );
    println!("\nType 'help' for available commands\n");

    let scheduler = match collaborators.mail.get() {
        Ok(mailer) => EmailScheduler::new(Arc::clone(mailer)),
        Err(_) => EmailScheduler::new(Arc::new(NullMailer)),
    };
    let poller = scheduler.start(config.poll_interval, config.poll_backoff);

    let assistant = Assistant::new(
        collaborators.tasks,
        collaborators.calendar,
        collaborators.mail,
        Arc::new(TemplateDrafter),
        Arc::clone(&scheduler),
        Arc::new(StdinConfirmer),
        config,
    );

    let stdin = io::stdin();
    loop {
        print!("\nYou: ");
        let _ = io::stdout().flush();

        let mut line = String::new();
        match stdin.lock().read_line(&mut line) {
            Ok(0) | Err(_) => break,
            Ok(_) => {}
        }
        let input = line.trim();
        if input.is_empty() {
            continue;
        }
        if matches!(input.to_lowercase().as_str(), "exit" | "quit" | "bye") {
            println!("Goodbye!");
            break;
        }

        let response = assistant.process(input).await;
        println!("\nAssistant: {}", response);
    }

    poller.stop().await;
}

/// Stands in when mail is unavailable; the send path is unreachable then,
/// but the scheduler still needs a transport to poll with.
struct NullMailer;

#[async_trait::async_trait]
impl MailTransport for NullMailer {
    async fn send(
        &self,
        _to: &[String],
        _cc: &[String],
        _bcc: &[String],
        _subject: &str,
        _body: &str,
    ) -> deskmate::error::Result<()> {
        Err(deskmate::error::AssistantError::Unavailable(
            "Email",
            "no account connected".to_string(),
        ))
    }
}
