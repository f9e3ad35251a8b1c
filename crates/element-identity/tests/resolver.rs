use std::sync::Arc;

use document_fixture::StaticDocument;
use element_identity::{
    describe_all, BatchOptions, DocumentDriver, ElementResolver, IdentityRule, NameSource,
};

const PAGE: &str = r#"<html><head><title>t</title></head><body>
  <nav class="top">
    <a href="/x">Home</a>
    <a id="brand" href="/"><img src="logo.png" alt="Logo"></a>
    <a href="/a-very-long-destination-path-that-keeps-going-on-and-on/and-on"><span class="icon"></span></a>
  </nav>
  <main>
    <button id="go">Go</button>
    <span id="l1">Save</span> <span id="l2">draft</span>
    <button aria-labelledby="l1 l2" aria-label="Ignored">Own text</button>
    <ul>
      <li>Item</li>
      <li>Item</li>
      <li class="hot">Hot</li>
    </ul>
    <p id="dup">First</p>
    <p id="dup">Second</p>
    <input type="email" name="email">
    <div><div></div><div></div></div>
  </main>
</body></html>"#;

fn setup() -> (Arc<StaticDocument>, ElementResolver) {
    let doc = Arc::new(StaticDocument::parse(PAGE));
    let resolver = ElementResolver::new(doc.clone());
    (doc, resolver)
}

#[tokio::test]
async fn link_with_text_keys_on_text() {
    let (doc, resolver) = setup();
    let home = doc.first("a[href='/x']").unwrap();

    let identity = resolver.identify(&home).await.unwrap();
    assert_eq!(identity.id.as_str(), "a[text='Home']");
    assert_eq!(identity.rule, IdentityRule::Text);

    let name = resolver.accessible_name(&home).await.unwrap();
    assert_eq!(name.name, "Home");
    assert_eq!(name.source.as_str(), "text_content");
    assert_eq!(name.priority, 3);
}

fn text_edges_page() -> String {
    let fifty = "0123456789".repeat(5);
    format!(
        r#"<html><body><main>
  <a href="/fifty">{fifty}</a>
  <a href="/fifty-one">{fifty}!</a>
  <span class="note">{fifty}!</span>
  <p>  Terms   and
     conditions  </p>
  <h2>Read   the   full   accessibility statement</h2>
  <span id="cap">Company logo</span>
  <img src="logo.png" aria-labelledby="cap" alt="Logo">
</main></body></html>"#
    )
}

async fn identify_first(
    doc: &StaticDocument,
    resolver: &ElementResolver,
    css: &str,
) -> element_identity::Identity {
    let element = doc.first(css).unwrap();
    resolver.identify(&element).await.unwrap()
}

#[tokio::test]
async fn text_rule_boundaries() {
    let doc = Arc::new(StaticDocument::parse(&text_edges_page()));
    let resolver = ElementResolver::new(doc.clone());
    let key = |css| identify_first(&doc, &resolver, css);

    // 50 characters: still keyed on text, cut to 30
    let fifty = key("a[href='/fifty']").await;
    assert_eq!(fifty.rule, IdentityRule::Text);
    assert_eq!(fifty.id.as_str(), "a[text='012345678901234567890123456789']");

    // 51 characters: falls through to href, then class
    let link = key("a[href='/fifty-one']").await;
    assert_eq!(link.rule, IdentityRule::Href);
    assert_eq!(link.id.as_str(), "a[href='/fifty-one']");
    let span = key("span.note").await;
    assert_eq!(span.rule, IdentityRule::Class);
    assert_eq!(span.id.as_str(), "span.note");

    assert_eq!(key("p").await.id.as_str(), "p[text='Terms and conditions']");
    assert_eq!(key("h2").await.id.as_str(), "h2[text='Read the full accessibility st']");
}

#[tokio::test]
async fn labelledby_beats_alt_on_images() {
    let doc = Arc::new(StaticDocument::parse(&text_edges_page()));
    let resolver = ElementResolver::new(doc.clone());
    let img = doc.first("img").unwrap();

    let name = resolver.accessible_name(&img).await.unwrap();
    assert_eq!(name.name, "Company logo");
    assert_eq!(name.source, NameSource::AriaLabelledBy);
    assert_eq!(name.priority, 1);
}

#[tokio::test]
async fn image_link_takes_child_alt() {
    let (doc, resolver) = setup();
    let brand = doc.first("#brand").unwrap();

    let identity = resolver.identify(&brand).await.unwrap();
    assert_eq!(identity.id.as_str(), "a#brand");

    let name = resolver.accessible_name(&brand).await.unwrap();
    assert_eq!(name.name, "Logo");
    assert_eq!(name.source, NameSource::ChildImageAlt);
    assert_eq!(name.source.as_str(), "alt (img enfant)");
    assert_eq!(name.priority, 4);

    let image = doc.first("img").unwrap();
    let name = resolver.accessible_name(&image).await.unwrap();
    assert_eq!((name.name.as_str(), name.source), ("Logo", NameSource::Alt));
}

#[tokio::test]
async fn unique_id_beats_text_and_is_stable() {
    let (doc, resolver) = setup();
    let go = doc.first("#go").unwrap();
    let first = resolver.identify(&go).await.unwrap();
    let second = resolver.identify(&go).await.unwrap();
    assert_eq!(first.id.as_str(), "button#go");
    assert_eq!(first.rule, IdentityRule::Id);
    assert_eq!(first, second);
}

#[tokio::test]
async fn labelledby_wins_over_every_other_source() {
    let (doc, resolver) = setup();
    let button = doc.first("button[aria-labelledby]").unwrap();
    let name = resolver.accessible_name(&button).await.unwrap();
    assert_eq!(name.name, "Save draft");
    assert_eq!(name.source, NameSource::AriaLabelledBy);
    assert_eq!(name.priority, 1);
}

#[tokio::test]
async fn duplicate_id_falls_through_to_text() {
    let (doc, resolver) = setup();
    let dups = doc.select("p").unwrap();
    let identity = resolver.identify(&dups[1]).await.unwrap();
    assert_eq!(identity.id.as_str(), "p[text='Second']");

    let locators = resolver.locators(&dups[1]).await.unwrap();
    assert_eq!(locators.primary.expression, "(//p[@id='dup'])[2]");
}

#[tokio::test]
async fn fallbacks_follow_rule_order() {
    let (doc, resolver) = setup();
    let icon_link = doc.first("a[href^='/a-very']").unwrap();
    let identity = resolver.identify(&icon_link).await.unwrap();
    assert_eq!(
        identity.id.as_str(),
        "a[href='/a-very-long-destination-path-that-keeps-going-on-']"
    );

    let icon = doc.first("span.icon").unwrap();
    assert_eq!(resolver.identify(&icon).await.unwrap().id.as_str(), "span.icon");

    let email = doc.first("input").unwrap();
    assert_eq!(
        resolver.identify(&email).await.unwrap().id.as_str(),
        "input[type='email']"
    );
}

#[tokio::test]
async fn structural_hash_is_degraded_and_position_sensitive() {
    let (doc, resolver) = setup();
    let inner = doc.select("div > div").unwrap();
    assert_eq!(inner.len(), 2);
    let a = resolver.identify(&inner[0]).await.unwrap();
    let b = resolver.identify(&inner[1]).await.unwrap();
    assert_eq!(a.rule, IdentityRule::StructuralHash);
    assert!(a.is_degraded());
    assert_ne!(a.id, b.id);
    assert_eq!(resolver.identify(&inner[0]).await.unwrap(), a);
    assert_eq!(resolver.degraded_ids().len(), 2);
}

#[tokio::test]
async fn every_locator_resolves_back_to_its_element() {
    let (doc, resolver) = setup();
    let all = doc.select("*").unwrap();
    assert!(all.len() > 20);
    for element in all {
        let locators = resolver.locators(&element).await.unwrap();
        assert!(!locators.degraded);
        assert_eq!(
            doc.query(&locators.primary).await.unwrap(),
            vec![element],
            "primary {} of {element}",
            locators.primary
        );
        assert_eq!(
            doc.query(&locators.css_primary).await.unwrap(),
            vec![element],
            "css primary {} of {element}",
            locators.css_primary
        );
        assert!(locators.secondary.len() <= 2);
        for secondary in &locators.secondary {
            assert_eq!(doc.query(secondary).await.unwrap(), vec![element], "{secondary}");
        }
        assert!(locators.css_secondary.len() <= locators.secondary.len());
        for secondary in &locators.css_secondary {
            assert_eq!(doc.query(secondary).await.unwrap(), vec![element], "{secondary}");
        }
    }
}

#[tokio::test]
async fn compound_css_secondary_is_position_qualified() {
    let doc = Arc::new(StaticDocument::parse(
        "<ul><li>Item</li><li>Item</li><li>Other</li></ul>",
    ));
    let resolver = ElementResolver::new(doc.clone());
    let items = doc.select("li").unwrap();

    let locators = resolver.locators(&items[1]).await.unwrap();
    assert_eq!(locators.secondary[0].expression, "(//ul/li)[2]");
    assert_eq!(locators.css_secondary[0].expression, "ul > li:nth-of-type(2)");
    assert_eq!(
        doc.query(&locators.css_secondary[0]).await.unwrap(),
        vec![items[1]]
    );
}

#[tokio::test]
async fn compound_css_secondary_matching_cousins_is_dropped() {
    let doc = Arc::new(StaticDocument::parse(
        "<ul><li>A</li><li>B</li></ul><ul><li>C</li><li>D</li></ul>",
    ));
    let resolver = ElementResolver::new(doc.clone());
    let b = doc.select("li").unwrap()[1];

    let locators = resolver.locators(&b).await.unwrap();
    let secondary: Vec<&str> = locators
        .secondary
        .iter()
        .map(|l| l.expression.as_str())
        .collect();
    assert_eq!(secondary, vec!["(//ul/li)[2]"]);
    assert!(locators.css_secondary.is_empty());
}

#[tokio::test]
async fn secondary_locators_use_attributes() {
    let (doc, resolver) = setup();
    let email = doc.first("input").unwrap();
    let locators = resolver.locators(&email).await.unwrap();
    let secondary: Vec<&str> = locators
        .secondary
        .iter()
        .map(|l| l.expression.as_str())
        .collect();
    assert_eq!(secondary, vec!["//input[@name='email']", "//input[@type='email']"]);
    assert_eq!(locators.css_secondary[0].expression, "input[name='email']");
}

#[tokio::test]
async fn cache_is_validated_before_reuse() {
    let (doc, resolver) = setup();
    let items = doc.select("li").unwrap();

    let first = resolver.locators(&items[0]).await.unwrap();
    let again = resolver.locators(&items[0]).await.unwrap();
    assert_eq!(first, again);
    assert_eq!(resolver.metrics().locator_cache.hits, 1);

    // same tag and text, different element
    let second = resolver.locators(&items[1]).await.unwrap();
    assert_ne!(first.primary, second.primary);
    assert_eq!(doc.query(&second.primary).await.unwrap(), vec![items[1]]);
    assert_eq!(resolver.metrics().locator_cache.misses, 2);

    resolver.reset();
    assert_eq!(resolver.metrics().locator_cache.hits, 0);
}

#[tokio::test]
async fn stale_elements_degrade_instead_of_failing() {
    let (doc, resolver) = setup();
    let item = doc.select("li").unwrap()[2];
    let snapshot = doc.describe(&item).await.unwrap();
    doc.detach(item);

    let locators = resolver.locators_of(&item, &snapshot).await.unwrap();
    assert!(locators.degraded);
    assert_eq!(locators.primary.expression, "//li");

    let identity = resolver.identify(&item).await.unwrap();
    assert_eq!(identity.rule, IdentityRule::Stale);
    let name = resolver.accessible_name(&item).await.unwrap();
    assert_eq!(name.source, NameSource::None);

    let metrics = resolver.metrics();
    assert!(metrics.stale_handles >= 2);
    assert_eq!(metrics.degraded_identities, 1);
}

#[tokio::test]
async fn batched_reads_keep_input_order() {
    let doc = Arc::new(StaticDocument::parse(PAGE));
    let handles = doc.select("*").unwrap();
    let driver: Arc<dyn DocumentDriver> = doc.clone();

    let before = doc.round_trips();
    let options = BatchOptions { size: 4, workers: 2 };
    let snapshots = describe_all(driver, &handles, options).await.unwrap();
    assert_eq!(snapshots.len(), handles.len());
    let expected_batches = handles.len().div_ceil(4) as u64;
    assert_eq!(doc.round_trips() - before, expected_batches);

    for (handle, snapshot) in handles.iter().zip(&snapshots) {
        let direct = doc.describe(handle).await.unwrap();
        assert_eq!(snapshot.as_ref().unwrap(), &direct);
    }
}
