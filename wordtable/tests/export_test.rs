use wordtable::error::{ConversionError, Direction};
use wordtable::params;
use wordtable::question::parse_quiz;
use wordtable::{export_questions, import_xhtml, ConversionContext, ConverterConfig};

const NBSP: &str = "\u{a0}";

const DESCRIPTION: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<quiz>
<!-- question: 0  -->
  <question type="category">
    <category>
        <text>$course$/Default for Test</text>
    </category>
  </question>
  <question type="description">
    <name>
      <text>A description</text>
    </name>
    <questiontext format="html">
      <text>The question text.</text>
    </questiontext>
    <generalfeedback format="html">
      <text>Here is some general feedback.</text>
    </generalfeedback>
    <defaultgrade>0</defaultgrade>
    <penalty>0</penalty>
    <hidden>0</hidden>
  </question>
</quiz>"#;

const MIXED: &str = r#"<quiz>
<question type="category"><category><text>$course$/Week 1</text></category></question>
<question type="multichoice">
  <name><text>Capital</text></name>
  <questiontext format="html"><text><![CDATA[<p>Capital of <b>France</b>? <span style="mso-bidi-font-weight:bold">Pick one</span></p>]]></text></questiontext>
  <generalfeedback format="html"><text><![CDATA[Think of the Seine -- the river.]]></text></generalfeedback>
  <defaultgrade>2</defaultgrade>
  <penalty>0.25</penalty>
  <single>true</single>
  <shuffleanswers>0</shuffleanswers>
  <answer fraction="100"><text>Paris</text><feedback><text>Yes</text></feedback></answer>
  <answer fraction="0"><text>Lyon</text><feedback><text>No</text></feedback></answer>
  <tags><tag><text>geo</text></tag></tags>
</question>
<question type="truefalse">
  <name><text>Sky</text></name>
  <questiontext format="html"><text>The sky is blue.</text></questiontext>
  <answer fraction="100"><text>true</text><feedback><text>Right</text></feedback></answer>
  <answer fraction="0"><text>false</text><feedback><text>Wrong</text></feedback></answer>
</question>
<question type="shortanswer">
  <name><text>Grass</text></name>
  <questiontext format="html"><text>Colour of grass?</text></questiontext>
  <usecase>1</usecase>
  <answer fraction="100"><text>green</text></answer>
</question>
<question type="essay">
  <name><text>Reflect</text></name>
  <questiontext format="html"><text>Write about your week.</text></questiontext>
</question>
</quiz>"#;

fn export(xml: &str) -> String {
    let doc = export_questions("quiz.xml", xml, &ConversionContext::default()).unwrap();
    String::from_utf8(doc.bytes).unwrap()
}

#[test]
fn test_export_description_table() {
    let html = export(DESCRIPTION);

    let expected = concat!(
        r#"<h2 class="MsoHeading2">A description</h2><p class="MsoBodyText"/><div class="TableDiv"><table border="1" dir="ltr"><thead>"#, "\n",
        r#"<tr><td colspan="3" style="width: 12.0cm"><p class="Cell">The question text.</p></td><td style="width: 1.0cm"><p class="QFType">DE</p></td></tr>"#, "\n",
        r#"<tr><td style="width: 1.0cm"><p class="Cell">~</p></td><td style="width: 5.0cm"><p class="TableHead">~</p></td><td style="width: 6.0cm"><p class="TableHead">~</p></td><td style="width: 1.0cm"><p class="TableHead">~</p></td></tr>"#, "\n",
        "</thead><tbody>\n",
        "\n",
        r#"<tr><td style="width: 1.0cm"><p class="Cell">~</p></td><th style="width: 5.0cm"><p class="TableRowHead">Tags:</p></th><td style="width: 6.0cm"><p class="Cell">~</p></td><td style="width: 1.0cm"><p class="Cell">~</p></td></tr>"#, "\n",
        r#"<tr><td colspan="3" style="width: 12.0cm"><p class="Cell"><i>"#,
    )
    .replace('~', NBSP);

    let start = html.find("<h2 ").expect("question heading");
    let tables = &html[start..];
    assert!(tables.starts_with(&expected), "{tables}");
    assert!(tables.ends_with(&format!(
        "</tbody></table></div><p class=\"MsoNormal\">{NBSP}</p>\n  </body>\n</html>\n"
    )));
    assert!(!tables.contains("general feedback"));
}

#[test]
fn test_export_document_shape() {
    let mut config = ConverterConfig::default();
    config.course_name = "Physics".to_string();
    config.author.name = "Sam Lee".to_string();
    config.course_id = "42".to_string();
    let ctx = ConversionContext::from_config(&config).unwrap();

    let doc = export_questions("physics quiz.xml", DESCRIPTION, &ctx).unwrap();
    assert_eq!(doc.file_name, "physics quiz.doc");
    assert_eq!(doc.mime, "application/msword");

    let html = String::from_utf8(doc.bytes).unwrap();
    assert!(!html.starts_with("<?xml"));
    assert!(html.starts_with(r#"<html lang="en" dir="ltr" xmlns="http://www.w3.org/1999/xhtml""#));
    assert!(html.contains("<title>Physics</title>"));
    assert!(html.contains(r#"<meta name="moodleCourseID" content="42"/>"#));
    assert!(html.contains("<o:Author>Sam Lee</o:Author>"));
    assert!(html.contains(r#"<h1 class="MsoHeading1">Default for Test</h1>"#));
    assert!(roxmltree::Document::parse(&html).is_ok());
}

#[test]
fn test_export_sanitizes_and_keeps_double_hyphens() {
    let html = export(MIXED);
    assert!(html.contains("Capital of <b>France</b>? Pick one"));
    assert!(!html.contains("mso-bidi"));
    assert!(html.contains("Think of the Seine -- the river."));
    assert!(html.contains(r#"<p class="QFType">MC</p>"#));
    assert!(html.contains(r#"<p class="QFType">TF</p>"#));
    assert!(html.contains(r#"<p class="QFType">SA</p>"#));
    assert!(html.contains(r#"<p class="QFType">ES</p>"#));
    assert!(html.contains("25%"));
}

#[test]
fn test_export_rtl() {
    let mut config = ConverterConfig::default();
    config.text_direction = params::TextDirection::Rtl;
    config.language = "he".to_string();
    let ctx = ConversionContext::from_config(&config).unwrap();
    let doc = export_questions("quiz.xml", DESCRIPTION, &ctx).unwrap();
    let html = String::from_utf8(doc.bytes).unwrap();
    assert!(html.contains(r#"<table border="1" dir="rtl">"#));
    assert!(html.starts_with(r#"<html lang="he" dir="rtl""#));
}

#[test]
fn test_export_without_questions() {
    let ctx = ConversionContext::default();
    for input in [
        "",
        "<quiz></quiz>",
        r#"<quiz><question type="category"><category><text>$course$/Only</text></category></question></quiz>"#,
    ] {
        let err = export_questions("quiz.xml", input, &ctx).unwrap_err();
        assert!(
            matches!(
                err,
                ConversionError::NoContent {
                    direction: Direction::Export
                }
            ),
            "{input}: {err}"
        );
        assert_eq!(err.user_message(), "No questions to export");
    }
}

#[test]
fn test_export_then_import_preserves_identity() {
    let ctx = ConversionContext::default();
    let original = parse_quiz(MIXED).unwrap();

    let doc = export_questions("quiz.xml", MIXED, &ctx).unwrap();
    let html = String::from_utf8(doc.bytes).unwrap();
    let reimported = parse_quiz(&import_xhtml(&html, &ctx).unwrap()).unwrap();

    let identities = |qs: &[wordtable::question::Question]| {
        qs.iter().map(|q| q.identity()).collect::<Vec<_>>()
    };
    assert_eq!(identities(&reimported), identities(&original));
    assert_eq!(reimported[0].kind, original[0].kind);
    assert_eq!(reimported[1].defaultgrade, 2.0);
    assert_eq!(reimported[1].penalty, 0.25);
    assert_eq!(reimported[1].tags, vec!["geo"]);
}

#[test]
fn test_custom_template() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("template.html");
    std::fs::write(
        &path,
        "<html><head><title>x</title></head><body class=\"custom\">\n</body></html>",
    )
    .unwrap();

    let mut config = ConverterConfig::default();
    config.template_path = Some(path);
    let ctx = ConversionContext::from_config(&config).unwrap();
    let html = String::from_utf8(
        export_questions("quiz.xml", DESCRIPTION, &ctx)
            .unwrap()
            .bytes,
    )
    .unwrap();
    assert!(html.contains("<body class=\"custom\"><h1 class=\"MsoHeading1\">"));
    assert!(html.ends_with("\n</body></html>"));
}

#[test]
fn test_missing_custom_template() {
    let mut config = ConverterConfig::default();
    config.template_path = Some("/nonexistent/template.html".into());
    assert!(matches!(
        ConversionContext::from_config(&config),
        Err(ConversionError::Io(_))
    ));
}
