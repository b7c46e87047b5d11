//! Scheduled-send queue for deferred email delivery.
//!
//! Holds pending send jobs and a background poller that flushes due ones.
//! Immediacy keywords in the originating directive bypass the queue and
//! send synchronously; a scheduled time already in the past is pushed
//! forward exactly 24 hours, never collapsed to send-now.

use std::sync::Arc;
use std::time::Duration;

use chrono::{Local, NaiveDateTime};
use parking_lot::Mutex;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::error::Result;
use crate::services::MailTransport;

const IMMEDIACY_KEYWORDS: [&str; 6] = [
    "now",
    "immediately",
    "right away",
    "asap",
    "straight away",
    "instantly",
];

/// One deferred send job.
#[derive(Debug, Clone)]
pub struct ScheduledEmail {
    pub id: Uuid,
    pub to: String,
    pub subject: String,
    pub body: String,
    pub send_at: NaiveDateTime,
}

/// How a schedule request was handled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScheduleOutcome {
    SentImmediately,
    Scheduled(NaiveDateTime),
}

pub struct EmailScheduler {
    jobs: Mutex<Vec<ScheduledEmail>>,
    mailer: Arc<dyn MailTransport>,
}

impl EmailScheduler {
    pub fn new(mailer: Arc<dyn MailTransport>) -> Arc<Self> {
        Arc::new(Self {
            jobs: Mutex::new(Vec::new()),
            mailer,
        })
    }

    /// Schedule a send, or perform it immediately when the originating
    /// directive asked for it. Immediate-path failures go to the caller.
    pub async fn schedule(
        &self,
        to: &str,
        subject: &str,
        body: &str,
        send_at: NaiveDateTime,
        context: &str,
        now: NaiveDateTime,
    ) -> Result<ScheduleOutcome> {
        let context_lower = context.to_lowercase();
        if IMMEDIACY_KEYWORDS
            .iter()
            .any(|kw| context_lower.contains(kw))
        {
            self.mailer
                .send(&[to.to_string()], &[], &[], subject, body)
                .await?;
            return Ok(ScheduleOutcome::SentImmediately);
        }

        let effective = if send_at <= now {
            send_at + chrono::Duration::hours(24)
        } else {
            send_at
        };

        self.jobs.lock().push(ScheduledEmail {
            id: Uuid::new_v4(),
            to: to.to_string(),
            subject: subject.to_string(),
            body: body.to_string(),
            send_at: effective,
        });
        log::info!("email to {} scheduled for {}", to, effective);
        Ok(ScheduleOutcome::Scheduled(effective))
    }

    pub fn pending_count(&self) -> usize {
        self.jobs.lock().len()
    }

    /// Send every job due at `now`. Due jobs are drained under the lock
    /// and sent outside it, so concurrent schedule calls are never
    /// skipped or double-sent. Returns (sent, failed); a failed send is
    /// logged and the job is not retried.
    pub async fn flush_due(&self, now: NaiveDateTime) -> (usize, usize) {
        let due: Vec<ScheduledEmail> = {
            let mut jobs = self.jobs.lock();
            let mut drained = Vec::new();
            let mut i = 0;
            while i < jobs.len() {
                if jobs[i].send_at <= now {
                    drained.push(jobs.remove(i));
                } else {
                    i += 1;
                }
            }
            drained
        };

        let mut sent = 0;
        let mut failed = 0;
        for job in due {
            match self
                .mailer
                .send(&[job.to.clone()], &[], &[], &job.subject, &job.body)
                .await
            {
                Ok(()) => {
                    log::info!("scheduled email sent: {}", job.subject);
                    sent += 1;
                }
                Err(e) => {
                    log::error!("scheduled email failed ({}): {}", job.subject, e);
                    failed += 1;
                }
            }
        }
        (sent, failed)
    }

    /// Spawn the background poller. The interval widens to `backoff`
    /// after an iteration with a failed send.
    pub fn start(self: &Arc<Self>, interval: Duration, backoff: Duration) -> PollerHandle {
        let (shutdown_tx, mut shutdown_rx) = watch::channel(false);
        let scheduler = Arc::clone(self);

        let handle = tokio::spawn(async move {
            let mut sleep_for = interval;
            loop {
                tokio::select! {
                    changed = shutdown_rx.changed() => {
                        if changed.is_err() || *shutdown_rx.borrow() {
                            break;
                        }
                    }
                    _ = tokio::time::sleep(sleep_for) => {
                        let now = Local::now().naive_local();
                        let (_, failed) = scheduler.flush_due(now).await;
                        sleep_for = if failed > 0 { backoff } else { interval };
                    }
                }
            }
            log::debug!("email scheduler poller stopped");
        });

        PollerHandle {
            shutdown: shutdown_tx,
            handle,
        }
    }
}

/// Shutdown handle for the poller task. Pending jobs do not survive a
/// stop; there is no persistence.
pub struct PollerHandle {
    shutdown: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

impl PollerHandle {
    pub async fn stop(self) {
        let _ = self.shutdown.send(true);
        let _ = self.handle.await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::NaiveDate;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingMailer {
        sends: AtomicUsize,
    }

    impl CountingMailer {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                sends: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl MailTransport for CountingMailer {
        async fn send(
            &self,
            _to: &[String],
            _cc: &[String],
            _bcc: &[String],
            _subject: &str,
            _body: &str,
        ) -> Result<()> {
            self.sends.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    fn at(h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 8, 19)
            .unwrap()
            .and_hms_opt(h, m, 0)
            .unwrap()
    }

    #[tokio::test]
    async fn test_immediacy_keyword_sends_now() {
        let mailer = CountingMailer::new();
        let scheduler = EmailScheduler::new(mailer.clone());
        let outcome = scheduler
            .schedule(
                "a@x.com",
                "Hi",
                "Body",
                at(18, 0),
                "send it right away please",
                at(12, 0),
            )
            .await
            .unwrap();
        assert_eq!(outcome, ScheduleOutcome::SentImmediately);
        assert_eq!(mailer.sends.load(Ordering::SeqCst), 1);
        assert_eq!(scheduler.pending_count(), 0);
    }

    #[tokio::test]
    async fn test_past_time_defers_24_hours() {
        let mailer = CountingMailer::new();
        let scheduler = EmailScheduler::new(mailer.clone());
        let outcome = scheduler
            .schedule("a@x.com", "Hi", "Body", at(11, 59), "send later", at(12, 0))
            .await
            .unwrap();
        // One minute in the past becomes exactly +24h, never send-now.
        assert_eq!(
            outcome,
            ScheduleOutcome::Scheduled(at(11, 59) + chrono::Duration::hours(24))
        );
        assert_eq!(mailer.sends.load(Ordering::SeqCst), 0);
        assert_eq!(scheduler.pending_count(), 1);
    }

    #[tokio::test]
    async fn test_flush_sends_only_due_jobs() {
        let mailer = CountingMailer::new();
        let scheduler = EmailScheduler::new(mailer.clone());
        scheduler
            .schedule("a@x.com", "Soon", "Body", at(13, 0), "", at(12, 0))
            .await
            .unwrap();
        scheduler
            .schedule("b@x.com", "Later", "Body", at(20, 0), "", at(12, 0))
            .await
            .unwrap();

        let (sent, failed) = scheduler.flush_due(at(13, 30)).await;
        assert_eq!((sent, failed), (1, 0));
        assert_eq!(mailer.sends.load(Ordering::SeqCst), 1);
        assert_eq!(scheduler.pending_count(), 1);

        let (sent, _) = scheduler.flush_due(at(21, 0)).await;
        assert_eq!(sent, 1);
        assert_eq!(scheduler.pending_count(), 0);
    }
}
