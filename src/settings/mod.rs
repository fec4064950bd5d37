use std::sync::Arc;

use anyhow::Result;
use chrono::Weekday;
use serde::{Deserialize, Serialize};

use crate::errors::ReplygateError;
use crate::store::SettingsStore;

/// One weekday's opening window. `start`/`end` are local `HH:MM` strings
/// compared lexicographically; schedules never cross midnight, so a day
/// with `end < start` is a configuration error and evaluates as closed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DaySchedule {
    pub enabled: bool,
    pub start: String,
    pub end: String,
}

impl DaySchedule {
    pub fn open(start: &str, end: &str) -> Self {
        Self {
            enabled: true,
            start: start.to_string(),
            end: end.to_string(),
        }
    }

    pub fn closed() -> Self {
        Self {
            enabled: false,
            start: "00:00".to_string(),
            end: "00:00".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BusinessHoursConfig {
    /// When false, the policy engine skips the after-hours branch entirely.
    pub enabled: bool,
    /// IANA timezone name, e.g. "America/Sao_Paulo".
    pub timezone: String,
    pub monday: DaySchedule,
    pub tuesday: DaySchedule,
    pub wednesday: DaySchedule,
    pub thursday: DaySchedule,
    pub friday: DaySchedule,
    pub saturday: DaySchedule,
    pub sunday: DaySchedule,
}

impl BusinessHoursConfig {
    pub fn day(&self, weekday: Weekday) -> &DaySchedule {
        match weekday {
            Weekday::Mon => &self.monday,
            Weekday::Tue => &self.tuesday,
            Weekday::Wed => &self.wednesday,
            Weekday::Thu => &self.thursday,
            Weekday::Fri => &self.friday,
            Weekday::Sat => &self.saturday,
            Weekday::Sun => &self.sunday,
        }
    }
}

impl Default for BusinessHoursConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            timezone: "UTC".to_string(),
            monday: DaySchedule::open("09:00", "18:00"),
            tuesday: DaySchedule::open("09:00", "18:00"),
            wednesday: DaySchedule::open("09:00", "18:00"),
            thursday: DaySchedule::open("09:00", "18:00"),
            friday: DaySchedule::open("09:00", "18:00"),
            saturday: DaySchedule::closed(),
            sunday: DaySchedule::closed(),
        }
    }
}

/// The four reply templates the policy engine selects from.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReplyTemplates {
    #[serde(rename = "newCustomer")]
    pub new_customer: String,
    #[serde(rename = "returningCustomer")]
    pub returning_customer: String,
    #[serde(rename = "afterHours")]
    pub after_hours: String,
    pub fallback: String,
}

impl Default for ReplyTemplates {
    fn default() -> Self {
        Self {
            new_customer: "Hi! Thanks for reaching out — one of our team will be with you shortly."
                .to_string(),
            returning_customer: "Welcome back! We'll get to your message as soon as possible."
                .to_string(),
            after_hours: "Thanks for your message! We're currently closed and will reply during business hours."
                .to_string(),
            fallback: "Thanks for your message — we'll be in touch soon.".to_string(),
        }
    }
}

/// Outbound channel credentials. Opaque strings; empty means unset, which
/// suppresses all auto-reply dispatch.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChannelCredentials {
    #[serde(rename = "accessToken")]
    pub access_token: String,
    #[serde(rename = "phoneNumberId")]
    pub phone_number_id: String,
}

impl ChannelCredentials {
    pub fn is_set(&self) -> bool {
        !self.access_token.is_empty() && !self.phone_number_id.is_empty()
    }
}

/// Process-wide bot settings. One instance per deployment; mutated only
/// through [`SettingsHandle::update`], hot-reloadable between deliveries.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BotSettings {
    pub active: bool,
    #[serde(rename = "businessHours")]
    pub business_hours: BusinessHoursConfig,
    pub templates: ReplyTemplates,
    pub credentials: ChannelCredentials,
}

impl Default for BotSettings {
    fn default() -> Self {
        Self {
            active: true,
            business_hours: BusinessHoursConfig::default(),
            templates: ReplyTemplates::default(),
            credentials: ChannelCredentials::default(),
        }
    }
}

impl BotSettings {
    /// Reject updates the rest of the system cannot act on. The hours
    /// evaluator fails open on a bad timezone at lookup time, so catching it
    /// here is the only place the operator actually hears about it.
    pub fn validate(&self) -> Result<(), ReplygateError> {
        if self.business_hours.enabled {
            if self.business_hours.timezone.parse::<chrono_tz::Tz>().is_err() {
                return Err(ReplygateError::Config(format!(
                    "unknown timezone '{}'",
                    self.business_hours.timezone
                )));
            }
            for (name, day) in [
                ("monday", &self.business_hours.monday),
                ("tuesday", &self.business_hours.tuesday),
                ("wednesday", &self.business_hours.wednesday),
                ("thursday", &self.business_hours.thursday),
                ("friday", &self.business_hours.friday),
                ("saturday", &self.business_hours.saturday),
                ("sunday", &self.business_hours.sunday),
            ] {
                if day.enabled && (!is_hhmm(&day.start) || !is_hhmm(&day.end)) {
                    return Err(ReplygateError::Config(format!(
                        "{}: schedule times must be HH:MM, got '{}'..'{}'",
                        name, day.start, day.end
                    )));
                }
            }
        }
        Ok(())
    }
}

fn is_hhmm(s: &str) -> bool {
    let b = s.as_bytes();
    if b.len() != 5 || b[2] != b':' {
        return false;
    }
    if !b.iter().enumerate().all(|(i, c)| i == 2 || c.is_ascii_digit()) {
        return false;
    }
    let hour = (b[0] - b'0') * 10 + (b[1] - b'0');
    let minute = (b[3] - b'0') * 10 + (b[4] - b'0');
    hour < 24 && minute < 60
}

/// Explicit handle to the settings singleton, passed to the pipeline and
/// gateway instead of ambient global state. Lazily initializes documented
/// defaults on first access.
#[derive(Clone)]
pub struct SettingsHandle {
    store: Arc<dyn SettingsStore>,
}

impl SettingsHandle {
    pub fn new(store: Arc<dyn SettingsStore>) -> Self {
        Self { store }
    }

    /// Current settings; writes defaults on first access.
    pub async fn get(&self) -> Result<BotSettings> {
        if let Some(settings) = self.store.get_settings().await? {
            return Ok(settings);
        }
        let defaults = BotSettings::default();
        self.store.put_settings(&defaults).await?;
        Ok(defaults)
    }

    /// Replace the singleton wholesale. Takes effect for the next delivery.
    pub async fn update(&self, settings: BotSettings) -> Result<BotSettings> {
        settings.validate()?;
        self.store.put_settings(&settings).await?;
        Ok(settings)
    }

    /// Drop stored settings so the next access re-initializes defaults.
    pub async fn reset(&self) -> Result<()> {
        self.store.clear_settings().await
    }
}

#[cfg(test)]
mod tests;
