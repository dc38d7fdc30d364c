// SPDX-FileCopyrightText: 2025 Stanislaw Grams <stanislawgrams@gmail.com>
//
// SPDX-License-Identifier: BSD-2-Clause

/// Lowercase alphanumeric form used as a registry key.
pub fn normalize_name(name: &str) -> String {
    name.to_ascii_lowercase()
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_name() {
        assert_eq!(normalize_name("Simulated"), "simulated");
        assert_eq!(normalize_name("sysfs-GPIO"), "sysfsgpio");
        assert_eq!(normalize_name("gpio_v2"), "gpiov2");
    }
}
