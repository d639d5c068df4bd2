use mime_router::{AcceptMap, Quality};

#[test]
fn qualities_follow_the_header() {
    let accept = AcceptMap::parse("text/html, text/plain;q=0.9, application/json;q=0.5");
    assert_eq!(accept.len(), 3);
    assert_eq!(accept.quality("text/html"), Quality::MAX);
    assert_eq!(accept.quality("text/plain"), Quality::from_millis(900));
    assert_eq!(accept.quality("application/json"), Quality::from_millis(500));
    assert_eq!(accept.quality("image/png"), Quality::ZERO);
}

#[test]
fn wildcards_resolve_after_exact_entries() {
    let accept = AcceptMap::parse("text/*;q=0.8, */*;q=0.1");
    assert_eq!(accept.quality("text/html"), Quality::from_millis(800));
    assert_eq!(accept.quality("image/png"), Quality::from_millis(100));

    let accept = AcceptMap::parse("text/html;q=0.2, text/*");
    assert_eq!(accept.quality("text/html"), Quality::from_millis(200));
    assert_eq!(accept.quality("text/plain"), Quality::MAX);
}

#[test]
fn malformed_tokens_are_skipped() {
    let accept = AcceptMap::parse("garbage, ;q=0.5, /half, text/html");
    assert_eq!(accept.len(), 1);
    assert_eq!(accept.quality("text/html"), Quality::MAX);
}

#[test]
fn unparsable_q_falls_back_to_one() {
    let accept = AcceptMap::parse("text/html;q=abc");
    assert_eq!(accept.quality("text/html"), Quality::MAX);
}

#[test]
fn q_values_are_clamped() {
    let accept = AcceptMap::parse("text/html;q=9");
    assert_eq!(accept.quality("text/html"), Quality::MAX);
    assert_eq!(Quality::parse("-1"), Some(Quality::ZERO));
    assert_eq!(Quality::parse("0.125"), Some(Quality::from_millis(125)));
    assert_eq!(Quality::parse("nope"), None);
}

#[test]
fn empty_header_means_no_negotiation() {
    let accept = AcceptMap::parse("");
    assert!(accept.is_empty());
    assert_eq!(accept.quality("application/x-exotic"), Quality::MAX);
}

#[test]
fn lookup_is_case_insensitive() {
    let accept = AcceptMap::parse("TEXT/HTML;q=0.7");
    assert_eq!(accept.quality("text/html"), Quality::from_millis(700));
    assert_eq!(accept.quality("Text/Html"), Quality::from_millis(700));
}

#[test]
fn extra_parameters_do_not_hide_q() {
    let accept = AcceptMap::parse("text/html;level=1;q=0.8");
    assert_eq!(accept.quality("text/html"), Quality::from_millis(800));
}

#[test]
fn q_parameter_tolerates_case_and_spacing() {
    let accept = AcceptMap::parse("text/html;Q=0.5");
    assert_eq!(accept.quality("text/html"), Quality::from_millis(500));

    let accept = AcceptMap::parse("text/html; q = 0.5");
    assert_eq!(accept.quality("text/html"), Quality::from_millis(500));
}

#[test]
fn quality_ordering_is_total() {
    assert!(Quality::ZERO < Quality::from_millis(500));
    assert!(Quality::from_millis(500) < Quality::MAX);
    assert_eq!(Quality::from_millis(5000), Quality::MAX);
    assert!(Quality::ZERO.is_zero());
}
