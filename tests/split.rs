use std::fs;
use std::path::{Path, PathBuf};

use tempfile::TempDir;
use xmlsplit::{split, ChunkSplitter, MatchMode, SplitError, SplitOptions, XmlDocument};

fn write_input(dir: &TempDir, name: &str, content: &str) -> PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, content).unwrap();
    path
}

fn quiet_options(input: &Path, output_dir: &Path, element: &str, chunk_size: usize) -> SplitOptions {
    let mut options = SplitOptions::new(input, output_dir, element);
    options.chunk_size = chunk_size;
    options.quiet = true;
    options
}

fn run(options: SplitOptions) -> Result<xmlsplit::SplitReport, SplitError> {
    ChunkSplitter::new(options)?.run()
}

fn actions_xml(count: usize) -> String {
    let mut xml = String::from("<?xml version=\"1.0\" encoding=\"utf-8\"?>\n<action_types version=\"1.2\">\n");
    for i in 0..count {
        xml.push_str(&format!("  <action name=\"act_{i}\" type=\"combat\"><cost value=\"{i}\"/></action>\n"));
    }
    xml.push_str("</action_types>\n");
    xml
}

/// Child element `attr` values of the root of a written chunk file
fn chunk_values(path: &Path, attr: &str) -> Vec<String> {
    let doc = XmlDocument::parse(&fs::read(path).unwrap()).unwrap();
    let root = doc.root_element_id().unwrap();
    doc.child_elements(root)
        .map(|id| doc.get_attribute(id, attr).unwrap_or_default().to_string())
        .collect()
}

fn dir_entries(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

#[test]
fn splits_1200_elements_into_500_500_200() {
    let tmp = TempDir::new().unwrap();
    let input = write_input(&tmp, "action_types.xml", &actions_xml(1200));
    let out = tmp.path().join("out");

    let report = run(quiet_options(&input, &out, "action", 500)).unwrap();

    assert_eq!(report.found, 1200);
    let sizes: Vec<usize> = report.chunks.iter().map(|c| c.elements).collect();
    assert_eq!(sizes, vec![500, 500, 200]);
    assert_eq!(
        dir_entries(&out),
        vec!["action_types_part_1.xml", "action_types_part_2.xml", "action_types_part_3.xml"]
    );

    let all: Vec<String> = report
        .chunks
        .iter()
        .flat_map(|c| chunk_values(&c.path, "name"))
        .collect();
    let expected: Vec<String> = (0..1200).map(|i| format!("act_{i}")).collect();
    assert_eq!(all, expected);
}

#[test]
fn split_function_returns_written_paths() {
    let tmp = TempDir::new().unwrap();
    let input = write_input(&tmp, "action_types.xml", &actions_xml(3));
    let out = tmp.path().join("out");

    let paths = split(&input, &out, "action", 2).unwrap();
    assert_eq!(
        paths,
        vec![out.join("action_types_part_1.xml"), out.join("action_types_part_2.xml")]
    );
    assert!(paths.iter().all(|p| p.is_file()));
}

#[test]
fn exact_output_layout() {
    let tmp = TempDir::new().unwrap();
    let input = write_input(
        &tmp,
        "types.xml",
        "<action_types version=\"2\"><action name=\"a\" type=\"t\"/><action name=\"b\" type=\"t\"/><action name=\"c\" type=\"t\"/></action_types>",
    );
    let out = tmp.path().join("out");
    run(quiet_options(&input, &out, "action", 2)).unwrap();

    assert_eq!(
        fs::read_to_string(out.join("types_part_1.xml")).unwrap(),
        "<?xml version=\"1.0\" encoding=\"utf-8\"?>\n\
         <action_types version=\"2\">\n  \
         <action name=\"a\" type=\"t\" />\n  \
         <action name=\"b\" type=\"t\" />\n\
         </action_types>\n"
    );
    assert_eq!(
        fs::read_to_string(out.join("types_part_2.xml")).unwrap(),
        "<?xml version=\"1.0\" encoding=\"utf-8\"?>\n\
         <action_types version=\"2\">\n  \
         <action name=\"c\" type=\"t\" />\n\
         </action_types>\n"
    );
}

#[test]
fn root_attributes_keep_source_order() {
    let tmp = TempDir::new().unwrap();
    let input = write_input(
        &tmp,
        "ordered.xml",
        "<catalog zeta=\"1\" alpha=\"2\" mid=\"3\"><item/></catalog>",
    );
    let out = tmp.path().join("out");
    let report = run(quiet_options(&input, &out, "item", 10)).unwrap();

    let doc = XmlDocument::parse(&fs::read(&report.chunks[0].path).unwrap()).unwrap();
    let root = doc.root_element_id().unwrap();
    assert_eq!(doc.node_name(root), Some("catalog"));
    assert_eq!(doc.attribute_values(root), vec![("zeta", "1"), ("alpha", "2"), ("mid", "3")]);
}

#[test]
fn matched_elements_are_copied_whole() {
    let tmp = TempDir::new().unwrap();
    let input = write_input(
        &tmp,
        "deep.xml",
        "<root><group><action name=\"x\"><!-- note --><param k=\"v\">text<b>bold</b></param></action></group></root>",
    );
    let out = tmp.path().join("out");
    let report = run(quiet_options(&input, &out, "action", 5)).unwrap();

    let written = fs::read_to_string(&report.chunks[0].path).unwrap();
    assert!(written.contains("<action name=\"x\"><!-- note --><param k=\"v\">text<b>bold</b></param></action>"));
    assert!(!written.contains("<group>"));
}

#[test]
fn zero_matches_succeeds_without_files() {
    let tmp = TempDir::new().unwrap();
    let input = write_input(&tmp, "action_types.xml", &actions_xml(5));
    let out = tmp.path().join("out");

    let report = run(quiet_options(&input, &out, "missing_tag", 500)).unwrap();
    assert_eq!(report.found, 0);
    assert!(report.chunks.is_empty());
    assert!(dir_entries(&out).is_empty());
}

#[test]
fn root_is_never_a_match() {
    let tmp = TempDir::new().unwrap();
    let input = write_input(&tmp, "items.xml", "<item><item id=\"inner\"/></item>");
    let out = tmp.path().join("out");

    let report = run(quiet_options(&input, &out, "item", 10)).unwrap();
    assert_eq!(report.found, 1);
    assert_eq!(chunk_values(&report.chunks[0].path, "id"), vec!["inner"]);
}

#[test]
fn repeated_runs_produce_identical_files() {
    let tmp = TempDir::new().unwrap();
    let input = write_input(&tmp, "action_types.xml", &actions_xml(7));
    let out = tmp.path().join("out");

    let first = run(quiet_options(&input, &out, "action", 3)).unwrap();
    let before: Vec<Vec<u8>> = first.chunks.iter().map(|c| fs::read(&c.path).unwrap()).collect();

    let second = run(quiet_options(&input, &out, "action", 3)).unwrap();
    let after: Vec<Vec<u8>> = second.chunks.iter().map(|c| fs::read(&c.path).unwrap()).collect();

    assert_eq!(first.paths(), second.paths());
    assert_eq!(before, after);
}

#[test]
fn malformed_input_writes_nothing() {
    let tmp = TempDir::new().unwrap();
    let input = write_input(
        &tmp,
        "broken.xml",
        "<action_types><action name=\"x\" type=\"y\"</action_types>",
    );
    let out = tmp.path().join("out");

    let err = run(quiet_options(&input, &out, "action", 500)).unwrap_err();
    match &err {
        SplitError::MalformedInput { path, position, .. } => {
            assert_eq!(path, &input);
            assert_eq!(*position, 14);
        }
        other => panic!("expected MalformedInput, got {other:?}"),
    }
    assert_eq!(err.exit_code(), 2);
    assert!(!out.exists());
}

#[test]
fn mismatched_tags_are_malformed() {
    let tmp = TempDir::new().unwrap();
    let input = write_input(&tmp, "bad.xml", "<root><a></b></root>");
    let out = tmp.path().join("out");

    let err = run(quiet_options(&input, &out, "a", 500)).unwrap_err();
    assert!(matches!(err, SplitError::MalformedInput { .. }));
    assert!(!out.exists());
}

#[test]
fn missing_input_writes_nothing() {
    let tmp = TempDir::new().unwrap();
    let input = tmp.path().join("does_not_exist.xml");
    let out = tmp.path().join("out");

    let err = run(quiet_options(&input, &out, "action", 500)).unwrap_err();
    assert!(matches!(err, SplitError::MissingInput { .. }));
    assert_eq!(err.exit_code(), 3);
    assert!(!out.exists());
}

#[test]
fn unreadable_input_is_a_read_error() {
    let tmp = TempDir::new().unwrap();
    let out = tmp.path().join("out");

    let err = run(quiet_options(tmp.path(), &out, "action", 500)).unwrap_err();
    assert!(matches!(err, SplitError::ReadInput { .. }));
    assert_eq!(err.exit_code(), 5);
}

#[test]
fn output_dir_that_is_a_file_fails() {
    let tmp = TempDir::new().unwrap();
    let input = write_input(&tmp, "action_types.xml", &actions_xml(2));
    let blocker = write_input(&tmp, "out", "not a directory");

    let err = run(quiet_options(&input, &blocker, "action", 500)).unwrap_err();
    assert!(matches!(err, SplitError::CreateOutputDir { .. }));
    assert_eq!(err.exit_code(), 4);
}

#[test]
fn zero_chunk_size_is_rejected() {
    let tmp = TempDir::new().unwrap();
    let input = write_input(&tmp, "action_types.xml", &actions_xml(2));
    let out = tmp.path().join("out");

    let err = run(quiet_options(&input, &out, "action", 0)).unwrap_err();
    assert!(matches!(err, SplitError::InvalidArgument(_)));
    assert_eq!(err.exit_code(), 1);
    assert!(!out.exists());
}

#[test]
fn nested_matches_follow_mode() {
    let tmp = TempDir::new().unwrap();
    let input = write_input(
        &tmp,
        "nested.xml",
        "<root><item id=\"a\"><item id=\"b\"/></item><wrap><item id=\"c\"/></wrap></root>",
    );

    let out_all = tmp.path().join("all");
    let report = run(quiet_options(&input, &out_all, "item", 10)).unwrap();
    assert_eq!(report.found, 3);
    assert_eq!(chunk_values(&report.chunks[0].path, "id"), vec!["a", "b", "c"]);

    let out_outer = tmp.path().join("outer");
    let mut options = quiet_options(&input, &out_outer, "item", 10);
    options.mode = MatchMode::Outermost;
    let report = run(options).unwrap();
    assert_eq!(report.found, 2);
    assert_eq!(chunk_values(&report.chunks[0].path, "id"), vec!["a", "c"]);
}

#[test]
fn prefixed_names_match_in_full() {
    let tmp = TempDir::new().unwrap();
    let input = write_input(
        &tmp,
        "ns.xml",
        "<root xmlns:m=\"urn:m\"><m:item id=\"1\"/><item id=\"2\"/></root>",
    );
    let out = tmp.path().join("out");

    let report = run(quiet_options(&input, &out, "m:item", 10)).unwrap();
    assert_eq!(report.found, 1);
    assert_eq!(chunk_values(&report.chunks[0].path, "id"), vec!["1"]);
}

#[test]
fn overwrites_by_default() {
    let tmp = TempDir::new().unwrap();
    let input = write_input(&tmp, "action_types.xml", &actions_xml(2));
    let out = tmp.path().join("out");
    fs::create_dir(&out).unwrap();
    fs::write(out.join("action_types_part_1.xml"), "stale").unwrap();

    let report = run(quiet_options(&input, &out, "action", 500)).unwrap();
    assert_eq!(chunk_values(&report.chunks[0].path, "name"), vec!["act_0", "act_1"]);
}

#[test]
fn no_clobber_refuses_before_writing() {
    let tmp = TempDir::new().unwrap();
    let input = write_input(&tmp, "action_types.xml", &actions_xml(4));
    let out = tmp.path().join("out");
    fs::create_dir(&out).unwrap();
    fs::write(out.join("action_types_part_2.xml"), "keep me").unwrap();

    let mut options = quiet_options(&input, &out, "action", 2);
    options.no_clobber = true;
    let err = run(options).unwrap_err();

    assert!(matches!(&err, SplitError::OutputExists { path } if path.ends_with("action_types_part_2.xml")));
    assert_eq!(err.exit_code(), 4);
    assert!(!out.join("action_types_part_1.xml").exists());
    assert_eq!(fs::read_to_string(out.join("action_types_part_2.xml")).unwrap(), "keep me");
}

#[test]
fn dry_run_reports_plan_only() {
    let tmp = TempDir::new().unwrap();
    let input = write_input(&tmp, "action_types.xml", &actions_xml(1200));
    let out = tmp.path().join("out");

    let mut options = quiet_options(&input, &out, "action", 500);
    options.dry_run = true;
    let report = run(options).unwrap();

    assert!(!report.written);
    assert_eq!(report.found, 1200);
    assert_eq!(report.chunks.len(), 3);
    assert_eq!(report.chunks[2].path, out.join("action_types_part_3.xml"));
    assert_eq!(report.chunks[2].elements, 200);
    assert!(!out.exists());
}

#[test]
fn escaped_content_round_trips() {
    let tmp = TempDir::new().unwrap();
    let input = write_input(
        &tmp,
        "entities.xml",
        "<root title=\"R&amp;D &quot;lab&quot;\">\
         <item note=\"a &lt; b &amp;&amp; c &gt; d\" tab=\"x&#9;y\">fish &amp; chips &lt;hot&gt; &#233;</item>\
         </root>",
    );
    let out = tmp.path().join("out");
    let report = run(quiet_options(&input, &out, "item", 10)).unwrap();

    let doc = XmlDocument::parse(&fs::read(&report.chunks[0].path).unwrap()).unwrap();
    let root = doc.root_element_id().unwrap();
    assert_eq!(doc.get_attribute(root, "title"), Some("R&D \"lab\""));

    let item = doc.child_elements(root).next().unwrap();
    assert_eq!(doc.get_attribute(item, "note"), Some("a < b && c > d"));
    assert_eq!(doc.get_attribute(item, "tab"), Some("x\ty"));
    let text = doc.children(item).next().unwrap();
    assert_eq!(doc.text_content(text), Some("fish & chips <hot> é"));
}

#[test]
fn utf16_input_is_split() {
    let tmp = TempDir::new().unwrap();
    let xml = "<root><item id=\"ü\"/><item id=\"2\"/></root>";
    let mut bytes = vec![0xFF, 0xFE];
    for unit in xml.encode_utf16() {
        bytes.extend_from_slice(&unit.to_le_bytes());
    }
    let input = tmp.path().join("wide.xml");
    fs::write(&input, bytes).unwrap();
    let out = tmp.path().join("out");

    let report = run(quiet_options(&input, &out, "item", 1)).unwrap();
    assert_eq!(report.chunks.len(), 2);
    assert_eq!(chunk_values(&report.chunks[0].path, "id"), vec!["ü"]);
}

#[test]
fn doctype_entities_are_expanded() {
    let tmp = TempDir::new().unwrap();
    let input = write_input(
        &tmp,
        "declared.xml",
        "<!DOCTYPE r [<!ENTITY e \"expanded\"><!ENTITY amp2 \"a &amp; b\">]>\
         <r><item note=\"&e;\">&e;</item><item note=\"&amp2;\"/></r>",
    );
    let out = tmp.path().join("out");

    let report = run(quiet_options(&input, &out, "item", 10)).unwrap();
    assert_eq!(report.found, 2);
    assert_eq!(chunk_values(&report.chunks[0].path, "note"), vec!["expanded", "a & b"]);

    let doc = XmlDocument::parse(&fs::read(&report.chunks[0].path).unwrap()).unwrap();
    let item = doc.child_elements(doc.root_element_id().unwrap()).next().unwrap();
    let text = doc.children(item).next().unwrap();
    assert_eq!(doc.text_content(text), Some("expanded"));
}

#[test]
fn undeclared_entity_is_malformed() {
    let tmp = TempDir::new().unwrap();
    let input = write_input(&tmp, "undeclared.xml", "<!DOCTYPE r [<!ENTITY e \"x\">]><r><item>&f;</item></r>");
    let out = tmp.path().join("out");

    let err = run(quiet_options(&input, &out, "item", 10)).unwrap_err();
    assert!(matches!(err, SplitError::MalformedInput { .. }));
    assert!(!out.exists());
}

#[test]
fn latin1_input_is_decoded() {
    let tmp = TempDir::new().unwrap();
    let mut bytes = b"<?xml version=\"1.0\" encoding=\"ISO-8859-1\"?><r><item n=\"".to_vec();
    bytes.extend_from_slice(&[0xE9, b'"', b'/', b'>', b'<', b'/', b'r', b'>']);
    let input = tmp.path().join("latin.xml");
    fs::write(&input, bytes).unwrap();
    let out = tmp.path().join("out");

    let report = run(quiet_options(&input, &out, "item", 10)).unwrap();
    assert_eq!(chunk_values(&report.chunks[0].path, "n"), vec!["é"]);
    // chunks are always written as UTF-8
    let written = fs::read_to_string(&report.chunks[0].path).unwrap();
    assert!(written.contains("n=\"é\""));
}

#[test]
fn unsupported_declared_encoding_is_malformed() {
    let tmp = TempDir::new().unwrap();
    let input = write_input(
        &tmp,
        "ebcdic.xml",
        "<?xml version=\"1.0\" encoding=\"EBCDIC-US\"?><r><item/></r>",
    );
    let out = tmp.path().join("out");

    match run(quiet_options(&input, &out, "item", 10)).unwrap_err() {
        SplitError::MalformedInput { message, position, .. } => {
            assert_eq!(message, "Unsupported encoding 'EBCDIC-US'");
            assert_eq!(position, 0);
        }
        other => panic!("expected MalformedInput, got {other:?}"),
    }
    assert!(!out.exists());
}
