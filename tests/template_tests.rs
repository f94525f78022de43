// tests/template_tests.rs

use errdata::template::ast::Node;
use errdata::template::token::{tokenize, TokenKind};
use errdata::{params, ParamMap, Template, TemplateErrorKind};
use rand::{rngs::StdRng, Rng, SeedableRng};

fn render_own(format: &str, own: &ParamMap) -> String {
    Template::parse(format).render(own, &ParamMap::new(), None)
}

// ---
// Literal text
// ---

#[test]
fn random_literal_text_round_trips() {
    const ALPHABET: &[char] = &['a', 'Z', '0', ' ', '!', '=', '>', '#', '.', '\n', 'é', '中', '_', 'w'];
    let mut rng = StdRng::seed_from_u64(0x5eed);
    for _ in 0..500 {
        let len = rng.gen_range(0..40);
        let text: String = (0..len)
            .map(|_| ALPHABET[rng.gen_range(0..ALPHABET.len())])
            .collect();
        let template = Template::parse(&text);
        assert!(template.parse_error().is_none(), "{:?}", text);
        assert_eq!(render_own(&text, &ParamMap::new()), text);
    }
}

#[test]
fn escapes_render_verbatim() {
    let tokens = tokenize("\\%");
    assert_eq!(tokens.len(), 3);
    assert_eq!(tokens[1].kind, TokenKind::Text("%".into()));

    let own = params! { "A" => 1 };
    assert_eq!(render_own("\\%\\{A\\}", &own), "%{A}");
    assert_eq!(render_own("100%% \\$\\{\\}\\\\", &own), "100% ${}\\");
}

// ---
// Parse errors
// ---

#[test]
fn only_the_leftmost_error_is_reported() {
    let template = Template::parse("ok %!bad x } and { more");
    let err = template.parse_error().expect("parse error");
    assert!(matches!(
        err.kind(),
        TemplateErrorKind::ExpectedOpenBrace { after: "condition", .. }
    ));
    assert_eq!(err.span().start, 11);
    let rendered = render_own("ok %!bad x } and { more", &ParamMap::new());
    assert_eq!(rendered.matches("<!ERROR:").count(), 1);
    assert!(rendered.starts_with("ok %!bad x <!ERROR:"));
    assert!(rendered.ends_with(">} and { more"));
}

#[test]
fn tree_is_complete_after_a_parse_error() {
    let template = Template::parse("a %{B");
    assert!(template.parse_error().is_some());
    assert!(matches!(template.ast().root(), Node::Literal(_)));
}

// ---
// Conditionals and scoping
// ---

#[test]
fn conditionals_are_mutually_exclusive() {
    let maps = [ParamMap::new(), params! { "A" => 1 }, params! { "A" => 1, "B" => "b" }];
    for map in &maps {
        let empty = render_own("%!m=0{A}", map);
        let nonempty = render_own("%!m>0{A}", map);
        assert_eq!(empty.is_empty(), !map.is_empty());
        assert_eq!(nonempty.is_empty(), map.is_empty());
        assert_eq!(format!("{empty}{nonempty}"), "A");
    }
}

#[test]
fn named_conditions_and_selectors_are_equivalent() {
    let map = params! { "A" => 1 };
    for format in ["%!NonEmptyMap{yes}", "%!params>0{yes}", "%!map>0{yes}", "%!parameters>0{yes}"] {
        assert_eq!(render_own(format, &map), "yes", "{}", format);
    }
    assert_eq!(render_own("%!EmptyMap{yes}", &map), "");
}

#[test]
fn fields_never_cross_scopes() {
    let own = params! { "X" => "own" };
    let passed = params! { "Y" => "passed" };
    let template = Template::parse("[%{Y}] [${X}]");
    assert_eq!(
        template.render(&own, &passed, None),
        "[<missing value>] [<missing value>]"
    );
    assert!(template.verify_own(&own, None).is_err());
}

#[test]
fn binary_verb_renders_own_field() {
    let own = params! { "ValHundreds" => 128u32 };
    assert_eq!(render_own("0b%b{ValHundreds}", &own), "0b10000000");
}

#[test]
fn whole_map_renders_in_key_order() {
    let own = params! { "b" => 2, "a" => "x" };
    assert_eq!(render_own("%{m}", &own), "{a: x, b: 2}");
    assert_eq!(render_own("%!m>0{data: %v{params}}", &own), "data: {a: x, b: 2}");
}

#[test]
fn verb_errors_are_visible_in_the_message() {
    let own = params! { "Name" => "disk" };
    assert_eq!(render_own("%d{Name}", &own), "%!d(string=disk)");
}
