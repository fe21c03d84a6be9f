use once_cell::sync::Lazy;

/// Region label -> SQL LIKE patterns over the lowercased job location.
///
/// The patterns deliberately overmatch (two-letter US state codes match as a
/// ", xx" suffix, "% eu" catches trailing mentions). This is a soft filter for
/// browsing, not an authoritative classifier; adding a region is one new entry.
static REGION_PATTERNS: Lazy<Vec<(&'static str, Vec<&'static str>)>> = Lazy::new(|| {
    vec![
        (
            "united kingdom",
            vec![
                "%united kingdom%", "%uk%", "%great britain%", "%england%",
                "%scotland%", "%wales%", "%northern ireland%", "%london%",
                "%manchester%", "%birmingham%", "%leeds%", "%glasgow%",
                "%edinburgh%", "%bristol%", "%liverpool%", "%cardiff%",
                "%belfast%", "%newcastle%", "%sheffield%", "%nottingham%",
                "%cambridge%", "%oxford%",
            ],
        ),
        (
            "united states",
            vec![
                "%united states%", "%, us%", "% us", "%usa%", "%u.s.%",
                "%, al", "%, ak", "%, az", "%, ar", "%, ca", "%, co", "%, ct",
                "%, de", "%, fl", "%, ga", "%, hi", "%, id", "%, il", "%, in",
                "%, ia", "%, ks", "%, ky", "%, la", "%, me", "%, md", "%, ma",
                "%, mi", "%, mn", "%, ms", "%, mo", "%, mt", "%, ne", "%, nv",
                "%, nh", "%, nj", "%, nm", "%, ny", "%, nc", "%, nd", "%, oh",
                "%, ok", "%, or", "%, pa", "%, ri", "%, sc", "%, sd", "%, tn",
                "%, tx", "%, ut", "%, vt", "%, va", "%, wa", "%, wv", "%, wi", "%, wy",
                "%alabama%", "%alaska%", "%arizona%", "%arkansas%", "%california%",
                "%colorado%", "%connecticut%", "%delaware%", "%florida%", "%georgia%",
                "%hawaii%", "%idaho%", "%illinois%", "%indiana%", "%iowa%",
                "%kansas%", "%kentucky%", "%louisiana%", "%maine%", "%maryland%",
                "%massachusetts%", "%michigan%", "%minnesota%", "%mississippi%",
                "%missouri%", "%montana%", "%nebraska%", "%nevada%",
                "%new hampshire%", "%new jersey%", "%new mexico%", "%new york%",
                "%north carolina%", "%north dakota%", "%ohio%", "%oklahoma%",
                "%oregon%", "%pennsylvania%", "%rhode island%", "%south carolina%",
                "%south dakota%", "%tennessee%", "%texas%", "%utah%", "%vermont%",
                "%virginia%", "%washington%", "%west virginia%", "%wisconsin%", "%wyoming%",
                "%san francisco%", "%los angeles%", "%chicago%", "%houston%",
                "%phoenix%", "%seattle%", "%denver%", "%boston%", "%austin%",
                "%portland%", "%atlanta%", "%miami%", "%dallas%", "%san diego%",
                "%san jose%", "%philadelphia%", "%minneapolis%",
            ],
        ),
        (
            "canada",
            vec![
                "%canada%", "%, ca%",
                "%toronto%", "%vancouver%", "%montreal%", "%ottawa%",
                "%calgary%", "%edmonton%", "%winnipeg%", "%quebec%",
                "%ontario%", "%british columbia%", "%alberta%", "%nova scotia%",
            ],
        ),
        (
            "germany",
            vec![
                "%germany%", "%deutschland%", "%berlin%", "%munich%",
                "%münchen%", "%hamburg%", "%frankfurt%", "%cologne%",
                "%köln%", "%düsseldorf%", "%stuttgart%",
            ],
        ),
        (
            "france",
            vec![
                "%france%", "%paris%", "%lyon%", "%marseille%",
                "%toulouse%", "%bordeaux%", "%lille%",
            ],
        ),
        (
            "netherlands",
            vec![
                "%netherlands%", "%holland%", "%amsterdam%",
                "%rotterdam%", "%the hague%", "%utrecht%", "%eindhoven%",
            ],
        ),
        (
            "ireland",
            vec!["%ireland%", "%dublin%", "%cork%", "%galway%", "%limerick%"],
        ),
        (
            "australia",
            vec![
                "%australia%", "%sydney%", "%melbourne%", "%brisbane%",
                "%perth%", "%adelaide%", "%canberra%",
            ],
        ),
        (
            "india",
            vec![
                "%india%", "%bangalore%", "%bengaluru%", "%mumbai%",
                "%delhi%", "%hyderabad%", "%chennai%", "%pune%",
                "%kolkata%", "%noida%", "%gurgaon%", "%gurugram%",
            ],
        ),
        (
            "spain",
            vec![
                "%spain%", "%españa%", "%madrid%", "%barcelona%",
                "%valencia%", "%seville%", "%malaga%",
            ],
        ),
        (
            "italy",
            vec![
                "%italy%", "%italia%", "%rome%", "%roma%",
                "%milan%", "%milano%", "%turin%", "%naples%",
            ],
        ),
        (
            "sweden",
            vec!["%sweden%", "%stockholm%", "%gothenburg%", "%malmö%"],
        ),
        (
            "switzerland",
            vec![
                "%switzerland%", "%zürich%", "%zurich%", "%geneva%",
                "%genève%", "%bern%", "%basel%",
            ],
        ),
        ("singapore", vec!["%singapore%"]),
        ("japan", vec!["%japan%", "%tokyo%", "%osaka%", "%kyoto%"]),
        ("brazil", vec!["%brazil%", "%são paulo%", "%rio de janeiro%"]),
        (
            "mexico",
            vec!["%mexico%", "%ciudad de méxico%", "%guadalajara%", "%monterrey%"],
        ),
        (
            "poland",
            vec!["%poland%", "%warsaw%", "%krakow%", "%kraków%", "%wroclaw%"],
        ),
        ("portugal", vec!["%portugal%", "%lisbon%", "%lisboa%", "%porto%"]),
        (
            "remote / anywhere",
            vec!["%remote%", "%anywhere%", "%worldwide%", "%global%"],
        ),
        (
            "europe",
            vec!["%europe%", "%eu %", "% eu", "%european union%", "%emea%"],
        ),
    ]
});

/// Patterns for a region label (case-insensitive), or None for unknown labels.
pub fn region_patterns(label: &str) -> Option<&'static [&'static str]> {
    let needle = label.to_lowercase();
    REGION_PATTERNS
        .iter()
        .find(|(name, _)| *name == needle)
        .map(|(_, patterns)| patterns.as_slice())
}

/// All known labels in table order, for the filter dropdown.
pub fn region_labels() -> Vec<&'static str> {
    REGION_PATTERNS.iter().map(|(name, _)| *name).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_label_resolves_patterns() {
        let patterns = region_patterns("united kingdom").unwrap();
        assert!(patterns.contains(&"%london%"));
    }

    #[test]
    fn lookup_is_case_insensitive() {
        assert!(region_patterns("United Kingdom").is_some());
        assert!(region_patterns("GERMANY").is_some());
    }

    #[test]
    fn unknown_label_returns_none() {
        assert!(region_patterns("atlantis").is_none());
    }

    #[test]
    fn labels_cover_the_table() {
        let labels = region_labels();
        assert!(labels.contains(&"united states"));
        assert!(labels.contains(&"remote / anywhere"));
        assert_eq!(labels.len(), 21);
    }
}
