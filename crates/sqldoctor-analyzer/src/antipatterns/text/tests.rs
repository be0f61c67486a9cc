use super::*;

#[test]
fn test_mask_comments_preserves_offsets() {
    let sql = "SELECT a -- trailing * FROM\nFROM t /* SELECT * FROM x */ WHERE b = 1";
    let masked = mask_comments(sql);

    assert_eq!(masked.len(), sql.len());
    assert!(!masked.contains("trailing"));
    assert!(!masked.contains("SELECT * FROM x"));
    assert_eq!(masked.find("WHERE"), sql.find("WHERE"));
    assert!(masked.contains('\n'));
}

#[test]
fn test_mask_comments_nested_block() {
    let masked = mask_comments("a /* outer /* inner */ still comment */ b");
    assert_eq!(collapse_whitespace(&masked), "a b");
}

#[test]
fn test_comment_markers_inside_literals_and_identifiers() {
    let sql = "SELECT '--not a comment', [col--name] FROM t";
    assert_eq!(mask_comments(sql), sql);
}

#[test]
fn test_mask_literals() {
    let sql = "WHERE name = 'O''Brien (x)' AND code = N'é'";
    let masked = mask_literals(sql);

    assert_eq!(masked.len(), sql.len());
    assert!(!masked.contains("Brien"));
    assert!(!masked.contains('('));
    assert!(masked.contains("AND code = N'"));
}

#[test]
fn test_mask_literals_skips_quoted_identifiers() {
    let sql = "SELECT t.[Owner's Name], \"It's\" FROM T t WHERE YEAR(t.Created) = '2024'";
    let masked = mask_literals(sql);

    assert_eq!(masked.len(), sql.len());
    assert!(masked.contains("[Owner's Name]"));
    assert!(masked.contains("\"It's\""));
    assert!(masked.contains("WHERE YEAR(t.Created) = '    '"));
}

#[test]
fn test_matching_paren() {
    let sql = "f(a, g(b), c) + 1";
    assert_eq!(matching_paren(sql, 1), Some(12));
    assert_eq!(matching_paren(sql, 6), Some(8));
    assert_eq!(matching_paren(sql, 0), None);
    assert_eq!(matching_paren("(unclosed", 0), None);
}

#[test]
fn test_subquery_ranges_and_mask() {
    let sql = "SELECT a FROM t WHERE x IN ( SELECT y FROM u WHERE z > (select 1) ) AND w = 2";
    let ranges = subquery_ranges(sql);
    assert_eq!(ranges.len(), 2);
    assert_eq!(&sql[ranges[1].clone()], "(select 1)");

    let masked = mask_subqueries(sql);
    assert_eq!(masked.len(), sql.len());
    assert!(!masked.contains("FROM u"));
    assert!(masked.contains("AND w = 2"));
    assert!(masked.contains("IN ("));
}

#[test]
fn test_fragment_and_truncate() {
    let sql = "WHERE  UPPER(c.Name)\n  = 'X'";
    assert_eq!(fragment(sql, sql, 7..sql.len()), "UPPER(c.Name) = 'X'");
    assert_eq!(truncate("abcdef", 3), "abc...");
    assert_eq!(truncate("abc", 3), "abc");
}
