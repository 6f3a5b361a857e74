#![no_main]

use libfuzzer_sys::fuzz_target;

use graphcop::node_pattern::NodePattern;
use graphcop::parse::parse_tree;

fuzz_target!(|data: &[u8]| {
    let Ok(src) = std::str::from_utf8(data) else {
        return;
    };
    // Compilation must either succeed or return an error, never panic.
    let Ok(pattern) = NodePattern::compile(src) else {
        return;
    };
    let Ok(tree) = parse_tree(b"class T < Base\n  field :a, String, null: true\n  def a; end\nend\n")
    else {
        return;
    };
    for node in tree.pre_order(tree.root()) {
        let _ = pattern.match_node(&tree, node);
    }
});
