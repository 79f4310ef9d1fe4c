//! E-mail notifications
//!
//! Renders reminder and weekly report messages and hands them to the
//! configured [`Mailer`]. Delivery problems are logged, never returned.

use chrono::{NaiveDate, NaiveTime};
use regex::Regex;
use std::sync::Arc;

use crate::integrations::{EmailMessage, Mailer};
use crate::logging::log_notification_delivery;
use crate::models::{ReminderType, SleepReminder, SleepStatistics, User};

const FOOTER: &str = r#"<p style="margin-top: 30px; font-size: 12px; color: #718096;">
        This is an automated message from your AmbiDream sleep tracker.
    </p>"#;

/// Escape user-supplied text for inclusion in an HTML body
pub fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

/// Remove markup and collapse the blank lines left behind
///
/// Entities produced by [`escape_html`] are decoded again.
pub fn strip_tags(html: &str) -> String {
    let without_tags = Regex::new(r"<[^>]*>")
        .map(|re| re.replace_all(html, "").into_owned())
        .unwrap_or_else(|_| html.to_string());

    without_tags
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(|line| {
            line.replace("&lt;", "<")
                .replace("&gt;", ">")
                .replace("&quot;", "\"")
                .replace("&amp;", "&")
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn format_clock(time: NaiveTime) -> String {
    time.format("%I:%M %p").to_string()
}

fn tips(title: &str, items: &[&str]) -> String {
    let items: String = items.iter().map(|item| format!("<li>{}</li>", item)).collect();
    format!(
        r#"<div style="margin-top: 30px; padding: 15px; background-color: #EDF2F7; border-radius: 5px;">
        <h3 style="color: #2D3748;">{}</h3>
        <ul style="color: #4A5568;">{}</ul>
    </div>"#,
        title, items
    )
}

fn document(body: String) -> String {
    format!(
        r#"<html>
<body style="font-family: Arial, sans-serif; padding: 20px;">
    {}
    {}
</body>
</html>"#,
        body, FOOTER
    )
}

fn message(user: &User, subject: &str, html_body: String) -> EmailMessage {
    EmailMessage {
        to: user.email.clone(),
        subject: subject.to_string(),
        text_body: strip_tags(&html_body),
        html_body,
    }
}

fn custom_note(reminder: &SleepReminder) -> String {
    if reminder.message.trim().is_empty() {
        String::new()
    } else {
        format!(
            r#"<p style="font-size: 14px; color: #2D3748;"><em>{}</em></p>"#,
            escape_html(reminder.message.trim())
        )
    }
}

pub fn bedtime_reminder(user: &User, reminder: &SleepReminder) -> EmailMessage {
    let body = format!(
        r#"<h2 style="color: #4A5568;">Hi {name}!</h2>
    <p style="font-size: 16px; color: #2D3748;">It's {time} - your target bedtime is approaching.</p>
    <p style="font-size: 14px; color: #4A5568;">Consider winding down and preparing for bed soon.</p>
    {note}
    {tips}"#,
        name = escape_html(user.display_name()),
        time = format_clock(reminder.reminder_time),
        note = custom_note(reminder),
        tips = tips(
            "Sleep Tips:",
            &[
                "Put away electronic devices",
                "Dim the lights",
                "Practice relaxation techniques",
                "Keep your bedroom cool and comfortable",
            ],
        ),
    );
    message(user, "Time for Bed!", document(body))
}

pub fn wake_reminder(user: &User, reminder: &SleepReminder) -> EmailMessage {
    let body = format!(
        r#"<h2 style="color: #4A5568;">Good morning, {name}!</h2>
    <p style="font-size: 16px; color: #2D3748;">It's {time} - time to wake up and start your day!</p>
    <p style="font-size: 14px; color: #4A5568;">Don't forget to log your sleep session in the app.</p>
    {note}
    {tips}"#,
        name = escape_html(user.display_name()),
        time = format_clock(reminder.reminder_time),
        note = custom_note(reminder),
        tips = tips(
            "Morning Tips:",
            &[
                "Expose yourself to natural light",
                "Hydrate with a glass of water",
                "Do some light stretching",
                "Eat a healthy breakfast",
            ],
        ),
    );
    message(user, "Good Morning!", document(body))
}

pub fn log_reminder(user: &User, reminder: &SleepReminder) -> EmailMessage {
    let body = format!(
        r#"<h2 style="color: #4A5568;">Hi {name}!</h2>
    <p style="font-size: 16px; color: #2D3748;">Have you logged your sleep from last night yet?</p>
    <p style="font-size: 14px; color: #4A5568;">Tracking your sleep regularly helps you understand your sleep patterns.</p>
    {note}
    <p style="color: #2D3748;"><strong>Quick reminder:</strong> Log your bedtime, wake time, and how you felt!</p>"#,
        name = escape_html(user.display_name()),
        note = custom_note(reminder),
    );
    message(user, "Don't Forget to Log Your Sleep!", document(body))
}

pub fn weekly_report(user: &User, stats: &SleepStatistics, report_date: NaiveDate) -> EmailMessage {
    let stat = |title: &str, value: String| {
        format!(
            r#"<div style="padding: 20px; border-radius: 8px; background-color: #EBF8FF;">
            <h4 style="margin: 0;">{}</h4>
            <p style="font-size: 32px; font-weight: bold; margin: 10px 0;">{}</p>
        </div>"#,
            title, value
        )
    };

    let body = format!(
        r#"<h2 style="color: #4A5568;">Weekly Sleep Report for {name}</h2>
    <p style="font-size: 14px; color: #718096;">{date}</p>
    <h3 style="color: #2D3748;">Your Sleep Stats This Week:</h3>
    {hours}
    {sessions}
    {quality}
    {goal}
    <p style="color: #4A5568;">Consistency is key to better sleep. Keep tracking your sleep patterns.</p>"#,
        name = escape_html(user.display_name()),
        date = report_date.format("%B %d, %Y"),
        hours = stat("Average Sleep", format!("{:.1}h", stats.average_sleep_hours)),
        sessions = stat("Sleep Sessions", stats.sessions_count.to_string()),
        quality = stat(
            "Average Quality",
            format!("{:.1}/5", stats.average_quality.unwrap_or(0.0))
        ),
        goal = stat(
            "Goal Achievement",
            format!("{:.0}%", stats.goal_achievement_rate.unwrap_or(0.0))
        ),
    );
    message(user, "Your Weekly Sleep Report", document(body))
}

#[derive(Clone)]
pub struct NotificationService {
    mailer: Arc<dyn Mailer>,
}

impl NotificationService {
    pub fn new(mailer: Arc<dyn Mailer>) -> Self {
        Self { mailer }
    }

    /// Send a message, reporting success
    pub async fn deliver(&self, message: &EmailMessage, notification_type: &str) -> bool {
        match self.mailer.send(message).await {
            Ok(()) => {
                log_notification_delivery(&message.to, notification_type, true);
                true
            }
            Err(e) => {
                tracing::error!(
                    recipient = %message.to,
                    notification_type = %notification_type,
                    error = %e,
                    "Failed to send e-mail"
                );
                log_notification_delivery(&message.to, notification_type, false);
                false
            }
        }
    }

    pub async fn send_reminder(&self, user: &User, reminder: &SleepReminder) -> bool {
        let message = match reminder.reminder_type {
            ReminderType::Bedtime => bedtime_reminder(user, reminder),
            ReminderType::Wake => wake_reminder(user, reminder),
            ReminderType::Log => log_reminder(user, reminder),
        };
        self.deliver(&message, &reminder.reminder_type.to_string()).await
    }

    pub async fn send_weekly_report(
        &self,
        user: &User,
        stats: &SleepStatistics,
        report_date: NaiveDate,
    ) -> bool {
        self.deliver(&weekly_report(user, stats, report_date), "weekly_report")
            .await
    }
}
