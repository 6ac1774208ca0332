//! International calling-code lookup for destination categorization.

/// Assigned ITU E.164 country calling codes, grouped by zone.
const CALLING_CODES: &[&str] = &[
    // Zone 1/7
    "1", "7",
    // Zone 2
    "20", "27", "211", "212", "213", "216", "218", "220", "221", "222", "223", "224", "225",
    "226", "227", "228", "229", "230", "231", "232", "233", "234", "235", "236", "237", "238",
    "239", "240", "241", "242", "243", "244", "245", "246", "247", "248", "249", "250", "251",
    "252", "253", "254", "255", "256", "257", "258", "260", "261", "262", "263", "264", "265",
    "266", "267", "268", "269", "290", "291", "297", "298", "299",
    // Zone 3/4 (Europe)
    "30", "31", "32", "33", "34", "36", "39", "40", "41", "43", "44", "45", "46", "47", "48",
    "49", "350", "351", "352", "353", "354", "355", "356", "357", "358", "359", "370", "371",
    "372", "373", "374", "375", "376", "377", "378", "380", "381", "382", "383", "385", "386",
    "387", "389", "420", "421", "423",
    // Zone 5 (Americas)
    "51", "52", "53", "54", "55", "56", "57", "58", "500", "501", "502", "503", "504", "505",
    "506", "507", "508", "509", "590", "591", "592", "593", "594", "595", "596", "597", "598",
    "599",
    // Zone 6 (Oceania, South-East Asia)
    "60", "61", "62", "63", "64", "65", "66", "670", "672", "673", "674", "675", "676", "677",
    "678", "679", "680", "681", "682", "683", "685", "686", "687", "688", "689", "690", "691",
    "692",
    // Zone 8 (East Asia, special services)
    "81", "82", "84", "86", "850", "852", "853", "855", "856", "880", "886",
    // Zone 9 (Middle East, South and Central Asia)
    "90", "91", "92", "93", "94", "95", "98", "960", "961", "962", "963", "964", "965", "966",
    "967", "968", "970", "971", "972", "973", "974", "975", "976", "977", "992", "993", "994",
    "995", "996", "998",
];

/// Finds the country calling code a dialed number starts with, preferring
/// the longest assigned code. A leading `+` or international `00` escape is
/// stripped first. Returns `None` for numbers with no assigned code.
pub fn find_calling_code(number: &str) -> Option<&'static str> {
    let digits = number
        .strip_prefix("00")
        .or_else(|| number.strip_prefix('+'))
        .unwrap_or(number);

    for len in (1..=3).rev() {
        // len can land off a char boundary for non-ASCII input; such a
        // candidate has no calling code.
        let Some(head) = digits.get(..len) else {
            continue;
        };
        if let Some(code) = CALLING_CODES.iter().find(|code| **code == head) {
            return Some(code);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn longest_code_wins() {
        // "3" is not a code, "35" is not a code, "351" is.
        assert_eq!(find_calling_code("351912345678"), Some("351"));
        // "4" and "49" could both look plausible; only "49" is assigned.
        assert_eq!(find_calling_code("491711234567"), Some("49"));
        assert_eq!(find_calling_code("12125551234"), Some("1"));
    }

    #[test]
    fn international_escapes_are_stripped() {
        assert_eq!(find_calling_code("00351912345678"), Some("351"));
        assert_eq!(find_calling_code("+351912345678"), Some("351"));
    }

    #[test]
    fn unassigned_prefix_is_none() {
        assert_eq!(find_calling_code(""), None);
        assert_eq!(find_calling_code("000"), None);
        assert_eq!(find_calling_code("999123"), None);
    }

    #[test]
    fn non_ascii_candidates_have_no_code() {
        assert_eq!(find_calling_code("ç351912345678"), None);
        assert_eq!(find_calling_code("五一二345"), None);
        assert_eq!(find_calling_code("+ç"), None);
    }
}
