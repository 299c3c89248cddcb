use chrono::{TimeZone, Utc};
use serde_json::json;
use spiro::context::{Delimiters, TemplateContext};
use spiro::error::Error;
use spiro::functions::fixed_clock;
use spiro::renderer::{MiniJinjaRenderer, TemplateRenderer};
use spiro::spec::{parse_spec, SpecFormat};
use spiro::value::{Normalize, SpecValue};

fn renderer_for(spec: serde_json::Value) -> MiniJinjaRenderer {
    let context = TemplateContext::new(spec.normalize().unwrap()).unwrap();
    MiniJinjaRenderer::new(&context).unwrap()
}

fn render(spec: serde_json::Value, template: &str) -> spiro::error::Result<String> {
    renderer_for(spec).render(template)
}

#[test]
fn test_minijinja_engine() {
    let spec = json!({"name": "test", "value": 42});

    assert_eq!(render(spec.clone(), "Hello {{ name }}!").unwrap(), "Hello test!");
    assert_eq!(render(spec, "Value: {{ value }}").unwrap(), "Value: 42");
}

#[test]
fn test_dot_rooted_references() {
    let spec = json!({"Name": "World", "Owner": {"Email": "a@b.c"}});

    assert_eq!(render(spec.clone(), "Hello {{ .Name }}!").unwrap(), "Hello World!");
    assert_eq!(render(spec, "{{ .Owner.Email }}").unwrap(), "a@b.c");
}

#[test]
fn test_conditionals_and_loops() {
    let spec = json!({"Services": ["api", "web"], "Debug": true});
    let out = render(
        spec,
        "{{% for s in .Services %}}{{ s }};{{% endfor %}}{{% if Debug %}} debug{{% endif %}}",
    )
    .unwrap();
    assert_eq!(out, "api;web; debug");
}

#[test]
fn test_jinja_markers_are_plain_text() {
    let template = "echo {{ .N }} ${#ARR[@]} {% x %} {# x #}\n";
    assert_eq!(
        render(json!({"N": "x"}), template).unwrap(),
        "echo x ${#ARR[@]} {% x %} {# x #}\n"
    );

    let spec = json!({"_spiro_delimeters_": ["<%", "%>"], "N": "x"});
    let template = "a {# keep #} {% raw %}jinja{% endraw %} ${#x} {{ y }} <% .N %>";
    assert_eq!(
        render(spec, template).unwrap(),
        "a {# keep #} {% raw %}jinja{% endraw %} ${#x} {{ y }} x"
    );
}

#[test]
fn test_statements_and_comments_follow_delimiters() {
    let spec = json!({"_spiro_delimeters_": ["<%", "%>"], "On": true, "Items": [1, 2]});
    let template =
        "<%# note #%><%% if .On %%>on<%% endif %%>:<%% for i in .Items %%><% i %><%% endfor %%>";
    assert_eq!(render(spec, template).unwrap(), "on:12");

    let out = render(json!({"N": "x"}), "{{# note #}}{{% raw %}}{{ .N }}{{% endraw %}} {{ .N }}");
    assert_eq!(out.unwrap(), "{{ .N }} x");
}

#[test]
fn test_trailing_newline_is_kept() {
    assert_eq!(render(json!({"A": 1}), "{{ A }}\n").unwrap(), "1\n");
}

#[test]
fn test_undefined_variable_fails() {
    let err = render(json!({"Name": "World"}), "Hello {{ .Missing }}").unwrap_err();
    assert!(matches!(err, Error::UndefinedVariableError(_)), "{err:?}");

    let err = render(json!({"Owner": {}}), "{{ Owner.Email }}").unwrap_err();
    assert!(matches!(err, Error::UndefinedVariableError(_)), "{err:?}");
}

#[test]
fn test_undefined_variable_fails_with_custom_delimiters() {
    let spec = json!({"_spiro_delimeters_": ["<%", "%>"], "Name": "World"});
    let err = render(spec, "<% .Missing %>").unwrap_err();
    assert!(matches!(err, Error::UndefinedVariableError(_)), "{err:?}");
}

#[test]
fn test_custom_delimiters() {
    let spec = json!({"_spiro_delimeters_": ["<%", "%>"], "Name": "World"});
    let renderer = renderer_for(spec);

    assert!(renderer.is_templated("<% .Name %>.txt"));
    assert!(!renderer.is_templated("{{ .Name }}.txt"));
    assert_eq!(
        renderer.render("{{ not a var }} <% .Name %>").unwrap(),
        "{{ not a var }} World"
    );
}

#[test]
fn test_invalid_delimiters() {
    for delimiters in [json!(["<%"]), json!(["<%", 1]), json!("<%"), json!(["", "%>"])] {
        let spec = json!({"_spiro_delimeters_": delimiters}).normalize().unwrap();
        let err = TemplateContext::new(spec).unwrap_err();
        assert!(matches!(err, Error::DelimiterConfigError { .. }), "{err:?}");
    }
}

#[test]
fn test_default_delimiters() {
    let spec = SpecValue::empty_mapping();
    assert_eq!(Delimiters::from_spec(&spec).unwrap(), Delimiters::default());
}

#[test]
fn test_syntax_error() {
    let err = render(json!({}), "{{% if %}}x{{% endif %}}").unwrap_err();
    assert!(matches!(err, Error::TemplateSyntaxError(_)), "{err:?}");
}

#[test]
fn test_unknown_function() {
    let err = render(json!({"Name": "x"}), "{{ shout(.Name) }}").unwrap_err();
    assert!(matches!(err, Error::UnknownFunctionError(_)), "{err:?}");

    let err = render(json!({"Name": "x"}), "{{ Name|shout }}").unwrap_err();
    assert!(matches!(err, Error::UnknownFunctionError(_)), "{err:?}");
}

#[test]
fn test_case_functions() {
    let spec = json!({"Name": "hello wORLD"});
    assert_eq!(render(spec.clone(), "{{ title(.Name) }}").unwrap(), "Hello WORLD");
    assert_eq!(render(spec.clone(), "{{ upper(.Name) }}").unwrap(), "HELLO WORLD");
    assert_eq!(render(spec, "{{ Name|lower }}").unwrap(), "hello world");

    let spec = json!({"Project": "My Project"});
    assert_eq!(render(spec.clone(), "{{ Project|snakecase }}").unwrap(), "my_project");
    assert_eq!(render(spec, "{{ kebabcase(.Project) }}").unwrap(), "my-project");
}

#[test]
fn test_string_functions() {
    let spec = json!({"Path": "a/b/c"});
    assert_eq!(render(spec.clone(), r#"{{ stringreplace(.Path, "/", ".") }}"#).unwrap(), "a.b.c");
    assert_eq!(render(spec.clone(), r#"{{ Path|regexreplace("[ab]/", "") }}"#).unwrap(), "c");
    assert_eq!(render(spec, r#"{{ unescape("<b>") }}"#).unwrap(), "<b>");
}

#[test]
fn test_invalid_regex_pattern() {
    let err = render(json!({"Path": "a"}), r#"{{ regexreplace(.Path, "(", "") }}"#).unwrap_err();
    match err {
        Error::PatternError { function, .. } => assert_eq!(function, "regexreplace"),
        other => panic!("Expected PatternError, got {other:?}"),
    }
}

#[test]
fn test_json_functions() {
    let spec = json!({"Service": {"name": "api", "ports": [80, 443]}});
    assert_eq!(
        render(spec.clone(), "{{ json(.Service) }}").unwrap(),
        r#"{"name":"api","ports":[80,443]}"#
    );
    assert_eq!(
        render(spec, "{{ jsonindent(.Service.ports) }}").unwrap(),
        "[\n    80,\n    443\n]"
    );
}

#[test]
fn test_json_of_yaml_mapping_with_scalar_keys() {
    let spec = parse_spec("Codes:\n  404: missing\n  true: yes\n", SpecFormat::Yaml, "test").unwrap();
    let context = TemplateContext::new(spec).unwrap();
    let out = MiniJinjaRenderer::new(&context).unwrap().render("{{ json(.Codes) }}").unwrap();

    let parsed: serde_json::Value = serde_json::from_str(&out).unwrap();
    assert_eq!(parsed, json!({"404": "missing", "true": "yes"}));
}

#[test]
fn test_json_of_scalar_fails() {
    let err = render(json!({"Name": "x"}), "{{ jsonindent(.Name) }}").unwrap_err();
    match err {
        Error::SerializationError { function, .. } => assert_eq!(function, "jsonindent"),
        other => panic!("Expected SerializationError, got {other:?}"),
    }
}

#[test]
fn test_now_uses_injected_clock() {
    let clock = fixed_clock(Utc.with_ymd_and_hms(2030, 1, 2, 3, 4, 5).unwrap());
    let context = TemplateContext::new(SpecValue::empty_mapping()).unwrap().with_clock(clock);
    let renderer = MiniJinjaRenderer::new(&context).unwrap();

    assert_eq!(renderer.render("{{ now() }}").unwrap(), "2030-01-02T03:04:05Z");
    assert_eq!(renderer.render(r#"(c) {{ now("%Y") }}"#).unwrap(), "(c) 2030");
}

#[test]
fn test_json_and_yaml_specs_render_alike() {
    let json_spec = parse_spec(
        r#"{"Name": "demo", "Ports": [80, 443], "Meta": {"b": 2, "a": 1}}"#,
        SpecFormat::Json,
        "json",
    )
    .unwrap();
    let yaml_spec = parse_spec(
        "Meta:\n  a: 1\n  b: 2\nPorts: [80, 443]\nName: demo\n",
        SpecFormat::Yaml,
        "yaml",
    )
    .unwrap();

    let template = "{{ .Name }} {{ json(.Ports) }} {{ jsonindent(.Meta) }}";
    let render_with = |spec| {
        let context = TemplateContext::new(spec).unwrap();
        MiniJinjaRenderer::new(&context).unwrap().render(template).unwrap()
    };
    assert_eq!(render_with(json_spec), render_with(yaml_spec));
}
