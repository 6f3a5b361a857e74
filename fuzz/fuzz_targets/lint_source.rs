#![no_main]

use libfuzzer_sys::fuzz_target;

use graphcop::cop::graphql::field_definitions::{FieldDefinitions, FieldDefinitionsStyle};
use graphcop::parse::parse_tree;

fuzz_target!(|data: &[u8]| {
    // Prism recovers from any input; lowering and both styles must not panic.
    let Ok(tree) = parse_tree(data) else {
        return;
    };
    for style in [
        FieldDefinitionsStyle::GroupDefinitions,
        FieldDefinitionsStyle::ResolverAfterDefinition,
    ] {
        if let Ok(cop) = FieldDefinitions::new(style) {
            let _ = cop.check(&tree);
        }
    }
});
