use scraper::{ElementRef, Html, Selector};

#[track_caller]
pub(crate) fn must_get_form<'a>(html: &'a Html, selector: &str) -> ElementRef<'a> {
    html.select(&Selector::parse(selector).unwrap())
        .next()
        .unwrap_or_else(|| panic!("No form found matching {selector}"))
}

#[track_caller]
pub(crate) fn assert_hx_endpoint(form: &ElementRef<'_>, endpoint: &str, attribute: &str) {
    let hx_post = form
        .value()
        .attr(attribute)
        .unwrap_or_else(|| panic!("{attribute} attribute missing"));

    assert_eq!(
        hx_post, endpoint,
        "want form with attribute {attribute}=\"{endpoint}\", got {hx_post:?}"
    );
}

/// The values of every input named `name` inside `form`, in document order.
///
/// Checkboxes and radios only count when checked.
pub(crate) fn input_values(form: &ElementRef<'_>, name: &str) -> Vec<String> {
    form.select(&Selector::parse("input").unwrap())
        .filter(|input| input.value().attr("name") == Some(name))
        .filter(|input| {
            let type_ = input.value().attr("type").unwrap_or_default();
            !matches!(type_, "checkbox" | "radio") || input.value().attr("checked").is_some()
        })
        .map(|input| input.value().attr("value").unwrap_or_default().to_owned())
        .collect()
}
