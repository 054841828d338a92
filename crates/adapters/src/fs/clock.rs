use chrono::Local;
use stepshot_application::Clock;

pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
pub const FILE_STAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

#[derive(Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_timestamp_string(&self) -> String {
        Local::now().format(TIMESTAMP_FORMAT).to_string()
    }

    fn now_file_stamp(&self) -> String {
        Local::now().format(FILE_STAMP_FORMAT).to_string()
    }

    fn now_epoch_seconds(&self) -> u64 {
        u64::try_from(Local::now().timestamp()).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDateTime;

    use super::*;

    #[test]
    fn timestamps_use_expected_layouts() {
        let clock = SystemClock;
        let stamp = clock.now_timestamp_string();
        assert!(NaiveDateTime::parse_from_str(&stamp, TIMESTAMP_FORMAT).is_ok());
        let file_stamp = clock.now_file_stamp();
        assert_eq!(file_stamp.len(), 15);
        assert!(NaiveDateTime::parse_from_str(&file_stamp, FILE_STAMP_FORMAT).is_ok());
        assert!(clock.now_epoch_seconds() > 1_600_000_000);
    }
}
