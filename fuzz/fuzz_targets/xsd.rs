#![no_main]
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(xsd) = std::str::from_utf8(data)
        && let Ok(parsed) = schemaflow::xsd::parse_schema_document(xsd, Some("fuzz.xsd"))
    {
        let set = schemaflow::load(std::slice::from_ref(&parsed));
        let _ = set.unresolved_references();
    }
});
