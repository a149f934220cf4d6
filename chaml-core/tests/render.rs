use chaml_core::{
    CoreError, Format, Interpreter, Options, ScriptError, Value, compile, tree::MAX_NESTING_DEPTH,
};

fn render(template: &str) -> String {
    render_with(template, &Options::default())
}

fn render_with(template: &str, options: &Options) -> String {
    let mut interpreter = Interpreter::new().with_local("name", "World");
    compile(template, options, &mut interpreter).expect("template should compile")
}

fn with_format(format: Format) -> Options {
    Options {
        format,
        ..Options::default()
    }
}

fn escaping() -> Options {
    Options {
        escape_html: true,
        ..Options::default()
    }
}

#[test]
fn void_tags_depend_on_the_format() {
    assert_eq!(render("%br/\n"), "<br>\n");
    assert_eq!(render_with("%br/\n", &with_format(Format::Xhtml)), "<br />\n");
}

#[test]
fn nested_tags_are_closed_in_order() {
    assert_eq!(
        render("%html\n  %body\n    %p one\n    %p two\n"),
        "<html>\n  <body>\n    <p>one</p>\n    <p>two</p>\n  </body>\n</html>\n"
    );
}

#[test]
fn tabs_count_as_one_indent_level() {
    assert_eq!(render("%div\n\t%p x\n"), "<div>\n  <p>x</p>\n</div>\n");
}

#[test]
fn silent_comments_disappear_with_their_children() {
    assert_eq!(render("-# note\n  hidden\n%p shown\n"), "<p>shown</p>\n");
}

#[test]
fn pipe_runs_join_into_one_line() {
    assert_eq!(
        render("%p\n  foo |\n  bar |\n  baz\n"),
        "<p>\n  foo bar\n  baz\n</p>\n"
    );
}

#[test]
fn hash_attributes_keep_insertion_order() {
    assert_eq!(
        render("%a{href: \"/x\", title: 'T'} link\n"),
        "<a href='/x' title='T'>link</a>\n"
    );
}

#[test]
fn attribute_hashes_may_span_lines() {
    assert_eq!(
        render("%a{href: '/',\n   title: 't'} go\n"),
        "<a href='/' title='t'>go</a>\n"
    );
}

#[test]
fn shorthand_selectors_make_divs() {
    assert_eq!(
        render("#main.wide\n  %p x\n"),
        "<div class='wide' id='main'>\n  <p>x</p>\n</div>\n"
    );
}

#[test]
fn html_style_booleans_follow_the_format() {
    let template = "%input(type=\"checkbox\" checked)\n";
    assert_eq!(render(template), "<input type='checkbox' checked>\n");
    assert_eq!(
        render_with(template, &with_format(Format::Xhtml)),
        "<input type='checkbox' checked='checked' />\n"
    );
}

#[test]
fn scripts_share_locals_across_lines() {
    assert_eq!(
        render("- items = ['a', 'b']\n%p= items.join(', ')\n%p #{items.length} items\n"),
        "<p>a, b</p>\n<p>2 items</p>\n"
    );
}

#[test]
fn interpolated_text_uses_the_evaluator() {
    assert_eq!(render("Hello, #{name}!\n"), "Hello, World!\n");
    assert_eq!(render("\\= not code\n"), "= not code\n");
}

#[test]
fn css_filter_wraps_its_body() {
    assert_eq!(
        render(":css\n  p { color: red; }\n"),
        "<style>\n  p { color: red; }\n</style>\n"
    );
}

#[test]
fn xhtml_javascript_filter_adds_cdata_guards() {
    assert_eq!(
        render_with(":javascript\n  go();\n", &with_format(Format::Xhtml)),
        "<script type='text/javascript'>\n  //<![CDATA[\n    go();\n  //]]>\n</script>\n"
    );
}

#[test]
fn plain_filter_interpolates_without_parsing_markup() {
    assert_eq!(
        render(":plain\n  Hi #{name}\n  %b raw\n"),
        "Hi World\n%b raw\n"
    );
}

#[test]
fn escaped_filter_escapes_every_line() {
    assert_eq!(render(":escaped\n  <b>&</b>\n"), "&lt;b&gt;&amp;&lt;/b&gt;\n");
}

#[test]
fn preserve_filter_collapses_its_body() {
    assert_eq!(render(":preserve\n  a\n  b\n"), "a&#x000A;b\n");
}

#[test]
fn escape_html_escapes_evaluated_content() {
    assert_eq!(
        render_with("%p= '<b>'\n", &escaping()),
        "<p>&lt;b&gt;</p>\n"
    );
    assert_eq!(render_with("= '<b>'\n", &escaping()), "&lt;b&gt;\n");
    assert_eq!(render_with("!= '<b>'\n", &escaping()), "<b>\n");
    assert_eq!(render("&= '<b>'\n"), "&lt;b&gt;\n");
    assert_eq!(render("= '<b>'\n"), "<b>\n");
}

#[test]
fn outer_whitespace_trim_chomps_the_parent() {
    assert_eq!(render("%ul\n  %li> a\n"), "<ul><li>a</li></ul>\n");
}

#[test]
fn inner_whitespace_trim_inlines_children() {
    assert_eq!(render("%p<\n  = 1 + 1\n"), "<p>2</p>\n");
}

#[test]
fn preserve_script_encodes_preformatted_bodies() {
    assert_eq!(
        render("~ \"<pre>a\\nb</pre>\"\n"),
        "<pre>a&#x000A;b</pre>\n"
    );
}

#[test]
fn comments_and_conditional_comments() {
    assert_eq!(render("/ note\n"), "<!-- note -->\n");
    assert_eq!(
        render("/[if IE]\n  %p old\n"),
        "<!--[if IE]>\n  <p>old</p>\n<![endif]-->\n"
    );
}

#[test]
fn doctypes_follow_the_format() {
    assert_eq!(render("!!!\n"), "<!DOCTYPE html>\n");
    assert_eq!(
        render_with("!!!\n", &with_format(Format::Html4)),
        "<!DOCTYPE html PUBLIC \"-//W3C//DTD HTML 4.01 Transitional//EN\" \"http://www.w3.org/TR/html4/loose.dtd\">\n"
    );
    assert_eq!(
        render_with("!!! XML\n", &with_format(Format::Xhtml)),
        "<?xml version='1.0' encoding='utf-8' ?>\n"
    );
}

#[test]
fn closures_evaluate_in_document_order() {
    let mut seen = Vec::new();
    let mut evaluator = |code: &str| -> Result<Value, ScriptError> {
        seen.push(code.to_string());
        Ok(Value::from(code.to_uppercase()))
    };
    let html = compile("= a\n%p= b\n", &Options::default(), &mut evaluator)
        .expect("template should compile");
    assert_eq!(html, "A\n<p>B</p>\n");
    assert_eq!(seen, vec!["a", "b"]);
}

#[test]
fn evaluator_errors_abort_the_compile() {
    let err = compile("%p= missing\n", &Options::default(), &mut Interpreter::new()).unwrap_err();
    assert!(matches!(
        err,
        CoreError::Script(ScriptError::UndefinedVariable(ref name)) if name == "missing"
    ));
}

#[test]
fn unknown_filters_abort_the_compile() {
    let err = compile(":sass\n  a\n", &Options::default(), &mut Interpreter::new()).unwrap_err();
    assert!(matches!(err, CoreError::UnknownFilter(ref name) if name == "sass"));
}

#[test]
fn deep_nesting_is_rejected() {
    let template: String = (0..=MAX_NESTING_DEPTH + 1)
        .map(|depth| format!("{}x\n", " ".repeat(depth * 2)))
        .collect();
    let err = compile(&template, &Options::default(), &mut Interpreter::new()).unwrap_err();
    assert!(matches!(err, CoreError::NestingTooDeep { .. }));
}

#[test]
fn deeply_nested_expressions_are_syntax_errors() {
    let template = format!("= {}1{}\n", "(".repeat(10_000), ")".repeat(10_000));
    let err = compile(&template, &Options::default(), &mut Interpreter::new()).unwrap_err();
    assert!(matches!(err, CoreError::Script(ScriptError::Syntax { .. })));
}

#[test]
fn host_evaluator_failures_pass_through() {
    let mut evaluator = |code: &str| -> Result<Value, ScriptError> {
        Err(ScriptError::Host(format!("cannot run `{code}`")))
    };
    let err = compile("%p= boom\n", &Options::default(), &mut evaluator).unwrap_err();
    assert!(matches!(
        err,
        CoreError::Script(ScriptError::Host(ref message)) if message == "cannot run `boom`"
    ));
    assert_eq!(err.to_string(), "cannot run `boom`");
}

#[test]
fn outer_trim_skips_cleared_statement_lines() {
    assert_eq!(
        render("%div\n  - y = 1\n  %b> z\n"),
        "<div><b>z</b></div>\n"
    );
    assert_eq!(
        render("%div\n  %a x\n  - y = 1\n  %b> z\n"),
        "<div>\n  <a>x</a>  <b>z</b></div>\n"
    );
}

#[test]
fn inline_comments_escape_with_escape_html() {
    assert_eq!(render_with("/ a < b\n", &escaping()), "<!-- a &lt; b -->\n");
}
