/// Cross-aggregation views over interactions sharing a ligand or receptor symbol
use super::{Role, RoleSelection, Side, ratio};
use crate::catalog::Interaction;

/// One of the four cross-aggregation views
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum View {
    /// Receptors paired with this interaction's ligand, seen from the cancer ligand
    CancerLigand,
    /// Ligands paired with this interaction's receptor, seen from the cancer receptor
    CancerReceptor,
    StromalLigand,
    StromalReceptor,
}

impl View {
    pub const ALL: [View; 4] = [
        View::CancerLigand,
        View::CancerReceptor,
        View::StromalLigand,
        View::StromalReceptor,
    ];

    /// Role whose symbol groups interactions; also the role of the own gene
    pub fn group_role(self) -> Role {
        match self {
            View::CancerLigand | View::StromalLigand => Role::Ligand,
            View::CancerReceptor | View::StromalReceptor => Role::Receptor,
        }
    }

    /// Role whose expression is summed over the group
    pub fn partner_role(self) -> Role {
        match self.group_role() {
            Role::Ligand => Role::Receptor,
            Role::Receptor => Role::Ligand,
        }
    }

    pub fn side(self) -> Side {
        match self {
            View::CancerLigand | View::CancerReceptor => Side::Cancer,
            View::StromalLigand | View::StromalReceptor => Side::Stromal,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            View::CancerLigand => "cancer_ligand",
            View::CancerReceptor => "cancer_receptor",
            View::StromalLigand => "stromal_ligand",
            View::StromalReceptor => "stromal_receptor",
        }
    }
}

/// A partner symbol and its summed expression
#[derive(Debug, Clone, PartialEq)]
pub struct PartnerRank {
    pub symbol: String,
    pub expression: f64,
}

/// Derived statistics of one view
#[derive(Debug, Clone, PartialEq)]
pub struct ViewScore {
    /// Geometric mean of the summed partner expression and the own gene's
    /// expression; unset when the own role has no selected gene
    pub average: Option<f64>,
    /// Share of the view's side in the partner sum, [`super::UNDEFINED_RATIO`] when zero
    pub ratio: f64,
    /// Partner symbols by descending expression
    pub ranking: Vec<PartnerRank>,
}

fn symbol(interaction: &Interaction, role: Role) -> &str {
    match role {
        Role::Ligand => &interaction.ligand_symbol,
        Role::Receptor => &interaction.receptor_symbol,
    }
}

/// Aggregate the partners of interaction `idx` over every interaction sharing
/// its grouping symbol
pub(crate) fn cross_aggregate(
    view: View,
    idx: usize,
    interactions: &[Interaction],
    selections: &[RoleSelection],
) -> ViewScore {
    let group_role = view.group_role();
    let partner_role = view.partner_role();
    let key = symbol(&interactions[idx], group_role);

    let mut cancer_sum = 0.0;
    let mut stromal_sum = 0.0;
    let mut ranking: Vec<PartnerRank> = Vec::new();
    for (other, selection) in interactions.iter().zip(selections) {
        if symbol(other, group_role) != key {
            continue;
        }
        cancer_sum += selection.expression(partner_role, Side::Cancer);
        stromal_sum += selection.expression(partner_role, Side::Stromal);

        let partner = symbol(other, partner_role);
        if !ranking.iter().any(|r| r.symbol == partner) {
            ranking.push(PartnerRank {
                symbol: partner.to_string(),
                expression: selection.role_total(partner_role),
            });
        }
    }
    ranking.sort_by(|a, b| b.expression.total_cmp(&a.expression));

    let total = cancer_sum + stromal_sum;
    let own_side_sum = match view.side() {
        Side::Cancer => cancer_sum,
        Side::Stromal => stromal_sum,
    };

    ViewScore {
        average: selections[idx]
            .get(group_role, view.side())
            .map(|own| (total * own.expression).sqrt()),
        ratio: ratio(own_side_sum, total),
        ranking,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interaction::test_support::scored_catalog;
    use crate::interaction::{UNDEFINED_RATIO, score_interactions};

    const NONE: &[&str] = &[];

    #[test]
    fn test_view_roles() {
        assert_eq!(View::CancerLigand.partner_role(), Role::Receptor);
        assert_eq!(View::StromalReceptor.partner_role(), Role::Ligand);
        assert_eq!(View::StromalLigand.side(), Side::Stromal);
        assert_eq!(View::ALL.len(), 4);
    }

    #[test]
    fn test_ligand_views_group_by_ligand_symbol() {
        // cancer genes 1..=3 normalize against their own trimmed sum; stromal
        // genes likewise
        let (catalog, expression) = scored_catalog(
            &[
                ("1", "9606", 4.0),
                ("2", "9606", 2.0),
                ("3", "9606", 2.0),
                ("7", "10090", 1.0),
                ("8", "10090", 3.0),
            ],
            &[
                ("L", "RA", [&["1"], &["7"], &["2"], &["8"]], true, true),
                ("L", "RB", [&["1"], &["7"], &["3"], NONE], true, true),
                ("L", "RA", [&["1"], &["7"], NONE, &["7"]], true, true),
                ("M", "RA", [&["2"], NONE, &["1"], &["8"]], true, true),
            ],
        );
        let scores = score_interactions(&catalog, &expression);
        let n = |gene: &str| expression.normalized(catalog.gene_idx(gene).unwrap());

        let view = &scores[0].cancer_ligand;
        let cancer_sum = n("2") + n("3");
        let stromal_sum = n("8") + n("7");
        let total = cancer_sum + stromal_sum;
        assert!((view.ratio - cancer_sum / total).abs() < 1e-12);
        assert!((view.average.unwrap() - (total * n("1")).sqrt()).abs() < 1e-6);

        // RA appears twice; the first occurrence's expression is kept
        let symbols: Vec<&str> = view.ranking.iter().map(|r| r.symbol.as_str()).collect();
        assert_eq!(symbols.len(), 2);
        let ra = view.ranking.iter().find(|r| r.symbol == "RA").unwrap();
        assert!((ra.expression - (n("2") + n("8"))).abs() < 1e-6);
        assert!(view.ranking[0].expression >= view.ranking[1].expression);

        let stromal = &scores[0].stromal_ligand;
        assert!((stromal.ratio - stromal_sum / total).abs() < 1e-12);
        assert!((stromal.ratio + view.ratio - 1.0).abs() < 1e-12);
        assert!((stromal.average.unwrap() - (total * n("7")).sqrt()).abs() < 1e-6);

        // M is alone in its group
        assert_eq!(scores[3].cancer_ligand.ranking.len(), 1);
        assert_eq!(scores[3].stromal_ligand.average, None);
    }

    #[test]
    fn test_receptor_views_group_by_receptor_symbol() {
        let (catalog, expression) = scored_catalog(
            &[("1", "9606", 1.0), ("2", "9606", 3.0), ("8", "10090", 2.0)],
            &[
                ("LA", "R", [&["1"], NONE, NONE, &["8"]], true, false),
                ("LB", "R", [&["2"], NONE, NONE, &["8"]], true, false),
            ],
        );
        let scores = score_interactions(&catalog, &expression);

        let view = scores[0].view(View::CancerReceptor);
        assert_eq!(view.average, None);
        assert_eq!(view.ratio, 1.0);
        let symbols: Vec<&str> = view.ranking.iter().map(|r| r.symbol.as_str()).collect();
        assert_eq!(symbols, vec!["LB", "LA"]);

        let stromal = scores[1].view(View::StromalReceptor);
        assert_eq!(stromal.ratio, 0.0);
        assert!(stromal.average.unwrap() > 0.0);
    }

    #[test]
    fn test_empty_partner_sum_gives_sentinel() {
        let (catalog, expression) = scored_catalog(
            &[("1", "9606", 1.0)],
            &[("L", "R", [&["1"], NONE, NONE, NONE], true, false)],
        );
        let scores = score_interactions(&catalog, &expression);
        let view = &scores[0].cancer_ligand;
        assert_eq!(view.ratio, UNDEFINED_RATIO);
        assert_eq!(view.average, Some(0.0));
        assert_eq!(view.ranking.len(), 1);
        assert_eq!(view.ranking[0].expression, 0.0);
    }
}
