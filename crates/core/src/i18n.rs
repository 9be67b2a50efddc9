//! Locales, text direction, string tables and locale-aware formatting.

use chrono::{DateTime, Datelike, NaiveDate, Timelike, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::LazyLock;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Locale {
    #[default]
    En,
    Ar,
}

impl Locale {
    pub fn code(&self) -> &'static str {
        match self {
            Self::En => "en",
            Self::Ar => "ar",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "en" => Some(Self::En),
            "ar" => Some(Self::Ar),
            _ => None,
        }
    }

    pub fn direction(&self) -> Direction {
        match self {
            Self::Ar => Direction::Rtl,
            Self::En => Direction::Ltr,
        }
    }

    pub fn toggled(&self) -> Self {
        match self {
            Self::En => Self::Ar,
            Self::Ar => Self::En,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Ltr,
    Rtl,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ltr => "ltr",
            Self::Rtl => "rtl",
        }
    }
}

// ---------------------------------------------------------------------------
// String tables
// ---------------------------------------------------------------------------

static EN: LazyLock<HashMap<&'static str, &'static str>> = LazyLock::new(|| {
    HashMap::from([
        ("app.title", "Gym ERP"),
        ("scan.granted", "Access granted"),
        ("scan.denied", "Access denied"),
        ("scan.already_scanned", "Already scanned"),
        ("scan.source.online", "online"),
        ("scan.source.offline", "offline"),
        ("scan.reason.token_expired", "QR code has expired"),
        ("scan.reason.invalid_token", "QR code is not valid"),
        ("scan.reason.not_in_offline_roster", "Member not found in offline list"),
        ("kiosk.prompt", "Scan a member QR code"),
        ("kiosk.offline_banner", "Offline mode: scans are verified locally"),
        ("kiosk.synced", "Member list synced"),
        ("kiosk.pending", "Pending scans"),
        ("kiosk.replayed", "Pending scans submitted"),
        ("list.loading", "Loading..."),
        ("list.server_error", "Server error"),
        ("list.empty", "No {noun} found"),
        ("session.expired", "Your session has expired. Please sign in again."),
        ("locale.current", "Language"),
        ("locale.direction", "Direction"),
        ("tickets.created", "Ticket created"),
        ("tickets.replied", "Reply sent"),
    ])
});

static AR: LazyLock<HashMap<&'static str, &'static str>> = LazyLock::new(|| {
    HashMap::from([
        ("app.title", "نظام إدارة النادي"),
        ("scan.granted", "تم السماح بالدخول"),
        ("scan.denied", "تم رفض الدخول"),
        ("scan.already_scanned", "تم المسح مسبقاً"),
        ("scan.source.online", "متصل"),
        ("scan.source.offline", "غير متصل"),
        ("scan.reason.token_expired", "انتهت صلاحية رمز QR"),
        ("scan.reason.invalid_token", "رمز QR غير صالح"),
        ("scan.reason.not_in_offline_roster", "العضو غير موجود في القائمة المحلية"),
        ("kiosk.prompt", "امسح رمز QR الخاص بالعضو"),
        ("kiosk.offline_banner", "وضع عدم الاتصال: يتم التحقق محلياً"),
        ("kiosk.synced", "تمت مزامنة قائمة الأعضاء"),
        ("kiosk.pending", "عمليات مسح معلقة"),
        ("list.loading", "جارٍ التحميل..."),
        ("list.server_error", "خطأ في الخادم"),
        ("list.empty", "لا توجد نتائج ({noun})"),
        ("session.expired", "انتهت الجلسة. يرجى تسجيل الدخول مرة أخرى."),
        ("locale.current", "اللغة"),
        ("locale.direction", "الاتجاه"),
        ("tickets.created", "تم إنشاء التذكرة"),
        ("tickets.replied", "تم إرسال الرد"),
    ])
});

/// Looks up `key`, falling back to English and then to the key itself.
pub fn translate(locale: Locale, key: &str) -> &str {
    let table = match locale {
        Locale::En => &*EN,
        Locale::Ar => &*AR,
    };
    table
        .get(key)
        .or_else(|| EN.get(key))
        .copied()
        .unwrap_or(key)
}

// ---------------------------------------------------------------------------
// Formatting
// ---------------------------------------------------------------------------

const AR_MONTHS: [&str; 12] = [
    "يناير", "فبراير", "مارس", "أبريل", "مايو", "يونيو",
    "يوليو", "أغسطس", "سبتمبر", "أكتوبر", "نوفمبر", "ديسمبر",
];

const EN_MONTHS: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

/// Number, currency and date formatting bound to one locale.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Formatter {
    locale: Locale,
    currency: String,
}

impl Formatter {
    pub fn new(locale: Locale, currency: impl Into<String>) -> Self {
        Self {
            locale,
            currency: currency.into(),
        }
    }

    pub fn locale(&self) -> Locale {
        self.locale
    }

    pub fn number(&self, value: f64, fraction_digits: usize) -> String {
        let (group_sep, decimal_sep) = match self.locale {
            Locale::En => (',', '.'),
            Locale::Ar => ('\u{066C}', '\u{066B}'),
        };

        let fixed = format!("{:.*}", fraction_digits, value.abs());
        let (int_part, frac_part) = match fixed.split_once('.') {
            Some((i, f)) => (i, Some(f)),
            None => (fixed.as_str(), None),
        };

        let mut out = String::with_capacity(fixed.len() + int_part.len() / 3 + 1);
        if value < 0.0 && fixed.bytes().any(|b| b.is_ascii_digit() && b != b'0') {
            out.push('-');
        }
        for (i, ch) in int_part.chars().enumerate() {
            if i > 0 && (int_part.len() - i) % 3 == 0 {
                out.push(group_sep);
            }
            out.push(ch);
        }
        if let Some(frac) = frac_part {
            out.push(decimal_sep);
            out.push_str(frac);
        }
        self.localize_digits(&out)
    }

    pub fn currency(&self, amount: f64) -> String {
        let n = self.number(amount, 2);
        match self.locale {
            Locale::En if self.currency == "USD" => match n.strip_prefix('-') {
                Some(abs) => format!("-${abs}"),
                None => format!("${n}"),
            },
            Locale::En => format!("{} {n}", self.currency),
            Locale::Ar => format!("{n}\u{00A0}{}", self.currency),
        }
    }

    pub fn date(&self, date: NaiveDate) -> String {
        let month = date.month0() as usize;
        match self.locale {
            Locale::En => format!("{} {}, {}", EN_MONTHS[month], date.day(), date.year()),
            Locale::Ar => self.localize_digits(&format!(
                "{} {} {}",
                date.day(),
                AR_MONTHS[month],
                date.year()
            )),
        }
    }

    pub fn datetime(&self, at: DateTime<Utc>) -> String {
        let time = self.localize_digits(&format!("{:02}:{:02}", at.hour(), at.minute()));
        let sep = match self.locale {
            Locale::En => ", ",
            Locale::Ar => "\u{060C} ",
        };
        format!("{}{sep}{time}", self.date(at.date_naive()))
    }

    fn localize_digits(&self, s: &str) -> String {
        match self.locale {
            Locale::En => s.to_string(),
            Locale::Ar => s
                .chars()
                .map(|c| match c.to_digit(10) {
                    Some(d) => char::from_u32(0x0660 + d).unwrap_or(c),
                    None => c,
                })
                .collect(),
        }
    }
}
