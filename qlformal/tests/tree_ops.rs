use qlformal::prelude::*;

fn s(raw: u32) -> StmtId {
    StmtId::from_raw(raw)
}

#[test]
fn structural_equality_ignores_alternatives() {
    let a = ParseNode::new(s(2), vec![ParseNode::leaf(s(0)), ParseNode::leaf(s(1))]);
    let mut b = ParseNode::new(s(2), vec![ParseNode::leaf(s(0)), ParseNode::leaf(s(1))]);
    b.alternatives.push(ParseNode::leaf(s(9)));
    assert!(a.structurally_eq(&b));

    let c = ParseNode::new(s(2), vec![ParseNode::leaf(s(1)), ParseNode::leaf(s(0))]);
    assert!(!a.structurally_eq(&c), "child order is structural");
}

#[test]
fn rpn_is_postorder() {
    // root(leaf0, inner(leaf1)) => [0, 1, inner, root]
    let inner = ParseNode::new(s(3), vec![ParseNode::leaf(s(1))]);
    let root = ParseNode::new(s(4), vec![ParseNode::leaf(s(0)), inner]);
    let tree = ParseTree::new(root);
    assert_eq!(tree.rpn(), vec![s(0), s(1), s(3), s(4)]);
}

#[test]
fn metrics_are_cached_and_consistent() {
    let inner = ParseNode::new(s(3), vec![ParseNode::leaf(s(1))]);
    let root = ParseNode::new(s(4), vec![ParseNode::leaf(s(0)), inner]);
    let tree = ParseTree::new(root);
    assert_eq!(tree.max_depth(), 3);
    assert_eq!(tree.max_depth(), 3);

    let other = ParseTree::new(ParseNode::new(
        s(4),
        vec![ParseNode::leaf(s(0)), ParseNode::new(s(3), vec![ParseNode::leaf(s(1))])],
    ));
    assert_eq!(tree.level_two_sig(), other.level_two_sig());

    let different = ParseTree::new(ParseNode::new(
        s(5),
        vec![ParseNode::leaf(s(0)), ParseNode::new(s(3), vec![ParseNode::leaf(s(1))])],
    ));
    assert_ne!(tree.level_two_sig(), different.level_two_sig());
}

#[test]
fn expand_enumerates_alternative_combinations_primary_first() {
    // Two children, each with one alternative: 4 combinations, primary
    // combination first, rightmost child cycling fastest.
    let mut left = ParseNode::leaf(s(10));
    left.alternatives.push(ParseNode::leaf(s(11)));
    let mut right = ParseNode::leaf(s(20));
    right.alternatives.push(ParseNode::leaf(s(21)));
    let root = ParseNode::new(s(1), vec![left, right]);

    let variants = root.expand(10);
    let picks: Vec<(StmtId, StmtId)> = variants
        .iter()
        .map(|v| (v.children[0].stmt, v.children[1].stmt))
        .collect();
    assert_eq!(
        picks,
        vec![
            (s(10), s(20)),
            (s(10), s(21)),
            (s(11), s(20)),
            (s(11), s(21)),
        ]
    );
    assert!(variants.iter().all(|v| v.alternatives.is_empty()));
    assert!(variants.iter().all(|v| v.children.iter().all(|c| c.alternatives.is_empty())));
}

#[test]
fn expand_respects_the_cap() {
    let mut node = ParseNode::leaf(s(0));
    node.alternatives.push(ParseNode::leaf(s(1)));
    node.alternatives.push(ParseNode::leaf(s(2)));
    assert_eq!(node.expand(2).len(), 2);
    assert_eq!(node.expand(1)[0].stmt, s(0), "primary derivation comes first");
    assert!(node.expand(0).is_empty());
}

#[test]
fn expand_covers_root_alternatives() {
    let mut root = ParseNode::new(s(1), vec![ParseNode::leaf(s(10))]);
    root.alternatives.push(ParseNode::new(s(2), vec![ParseNode::leaf(s(10))]));
    let variants = root.expand(10);
    let roots: Vec<StmtId> = variants.iter().map(|v| v.stmt).collect();
    assert_eq!(roots, vec![s(1), s(2)]);
}
