#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Timeframe {
    pub label: String,
    pub minutes: u32,
}

impl Timeframe {
    pub fn parse(value: &str) -> Result<Self, String> {
        let normalized = value.trim().to_lowercase();
        let (label, minutes) = match normalized.as_str() {
            "1m" | "1min" => ("1min", 1),
            "3m" | "3min" => ("3min", 3),
            "5m" | "5min" => ("5min", 5),
            "10m" | "10min" => ("10min", 10),
            "15m" | "15min" => ("15min", 15),
            "30m" | "30min" => ("30min", 30),
            "1h" | "1hour" | "60m" | "60min" => ("1hour", 60),
            _ => return Err(format!("unsupported timeframe: {value}")),
        };
        Ok(Self {
            label: label.to_string(),
            minutes,
        })
    }

    pub fn parse_minutes(value: &str) -> Result<Self, String> {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err("empty timeframe".to_string());
        }
        let minutes: u32 = trimmed
            .parse()
            .map_err(|_| format!("invalid timeframe minutes: {value}"))?;
        if minutes == 0 || minutes > 60 {
            return Err(format!("timeframe minutes out of range (1..=60): {value}"));
        }
        Ok(Self {
            label: trimmed.to_string(),
            minutes,
        })
    }

    pub fn parse_or_minutes(value: &str) -> Result<Self, String> {
        Self::parse(value).or_else(|_| Self::parse_minutes(value))
    }
}
