const SI_UNITS: [&str; 7] = ["B", "kB", "MB", "GB", "TB", "PB", "EB"];
const IEC_UNITS: [&str; 7] = ["B", "KiB", "MiB", "GiB", "TiB", "PiB", "EiB"];

/// Human readable size: `1.5 KiB`, `12 MB`. Below 10 bytes the raw count is kept.
pub fn humanize_bytes(size: u64, iec: bool) -> String {
    if size < 10 {
        return format!("{} B", size);
    }
    let (base, units) = if iec {
        (1024u64, &IEC_UNITS)
    } else {
        (1000u64, &SI_UNITS)
    };

    let mut divisor = 1u64;
    let mut exp = 0;
    while exp + 1 < units.len() && size / divisor >= base {
        divisor *= base;
        exp += 1;
    }

    let value = ((size as f64 / divisor as f64) * 10.0 + 0.5).floor() / 10.0;
    if value < 10.0 {
        format!("{:.1} {}", value, units[exp])
    } else {
        format!("{:.0} {}", value, units[exp])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn small_sizes_stay_in_bytes() {
        assert_eq!(humanize_bytes(0, true), "0 B");
        assert_eq!(humanize_bytes(5, true), "5 B");
        assert_eq!(humanize_bytes(10, true), "10 B");
        assert_eq!(humanize_bytes(1023, true), "1023 B");
    }

    #[test]
    fn iec() {
        assert_eq!(humanize_bytes(1500, true), "1.5 KiB");
        assert_eq!(humanize_bytes(1024, true), "1.0 KiB");
        assert_eq!(humanize_bytes(1_073_741_824, true), "1.0 GiB");
        assert_eq!(humanize_bytes(50 * 1024 * 1024, true), "50 MiB");
        assert_eq!(humanize_bytes(u64::MAX, true), "16 EiB");
    }

    #[test]
    fn si() {
        assert_eq!(humanize_bytes(1500, false), "1.5 kB");
        assert_eq!(humanize_bytes(82_854_982, false), "83 MB");
        assert_eq!(humanize_bytes(999, false), "999 B");
    }
}
