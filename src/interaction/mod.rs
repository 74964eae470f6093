/// Ligand-receptor interaction scoring
///
/// For every catalog interaction the most expressed gene of each role is
/// selected, then directional averages, ligand/receptor ratios and four
/// cross-aggregation views are derived from the normalized expressions.
pub mod view;

pub use view::{PartnerRank, View, ViewScore};

use crate::catalog::{Catalog, Interaction};
use crate::expression::GeneExpression;

/// Ratio reported when its denominator is zero
pub const UNDEFINED_RATIO: f64 = -1.0;

/// Which of the two interacting genes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Ligand,
    Receptor,
}

/// Which sample a role's gene is taken from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Cancer,
    Stromal,
}

/// Selected gene of one role and its normalized expression
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SelectedGene {
    pub gene: usize,
    pub expression: f64,
}

/// Selections for the four roles of one interaction; `None` when the role has
/// no normalized candidate gene
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RoleSelection {
    pub ligand_cancer: Option<SelectedGene>,
    pub ligand_stromal: Option<SelectedGene>,
    pub receptor_cancer: Option<SelectedGene>,
    pub receptor_stromal: Option<SelectedGene>,
}

impl RoleSelection {
    fn select(interaction: &Interaction, expression: &GeneExpression) -> Self {
        Self {
            ligand_cancer: select_gene(&interaction.ligand_cancer, expression),
            ligand_stromal: select_gene(&interaction.ligand_stromal, expression),
            receptor_cancer: select_gene(&interaction.receptor_cancer, expression),
            receptor_stromal: select_gene(&interaction.receptor_stromal, expression),
        }
    }

    pub fn get(&self, role: Role, side: Side) -> Option<SelectedGene> {
        match (role, side) {
            (Role::Ligand, Side::Cancer) => self.ligand_cancer,
            (Role::Ligand, Side::Stromal) => self.ligand_stromal,
            (Role::Receptor, Side::Cancer) => self.receptor_cancer,
            (Role::Receptor, Side::Stromal) => self.receptor_stromal,
        }
    }

    /// Expression of a role, zero when nothing was selected
    pub fn expression(&self, role: Role, side: Side) -> f64 {
        self.get(role, side).map_or(0.0, |s| s.expression)
    }

    /// Cancer plus stromal expression of a role
    pub fn role_total(&self, role: Role) -> f64 {
        self.expression(role, Side::Cancer) + self.expression(role, Side::Stromal)
    }
}

/// Derived statistics of one interaction
#[derive(Debug, Clone, PartialEq)]
pub struct InteractionScore {
    pub selection: RoleSelection,
    /// Set when the cancer-to-stroma direction is valid
    pub average_cancer_to_stroma: Option<f64>,
    /// Set when the stroma-to-cancer direction is valid
    pub average_stroma_to_cancer: Option<f64>,
    /// Set when either direction is valid; [`UNDEFINED_RATIO`] on zero ligand expression
    pub ligand_ratio_cancer: Option<f64>,
    pub ligand_ratio_stroma: Option<f64>,
    /// Share of this interaction's ligand expression among all interactions on the same receptor
    pub ligand_possession: Option<f64>,
    pub receptor_ratio_cancer: f64,
    pub receptor_ratio_stroma: f64,
    pub cancer_ligand: ViewScore,
    pub cancer_receptor: ViewScore,
    pub stromal_ligand: ViewScore,
    pub stromal_receptor: ViewScore,
}

impl InteractionScore {
    pub fn view(&self, view: View) -> &ViewScore {
        match view {
            View::CancerLigand => &self.cancer_ligand,
            View::CancerReceptor => &self.cancer_receptor,
            View::StromalLigand => &self.stromal_ligand,
            View::StromalReceptor => &self.stromal_receptor,
        }
    }
}

/// Gene with the highest normalized expression; first wins ties
fn select_gene(genes: &[usize], expression: &GeneExpression) -> Option<SelectedGene> {
    let mut best: Option<SelectedGene> = None;
    for &gene in genes {
        let Some(input) = expression.get(gene) else {
            continue;
        };
        if best.map_or(true, |b| b.expression < input.normalized_expression) {
            best = Some(SelectedGene {
                gene,
                expression: input.normalized_expression,
            });
        }
    }
    best
}

/// `numerator / denominator`, or [`UNDEFINED_RATIO`] when the denominator is not positive
pub(crate) fn ratio(numerator: f64, denominator: f64) -> f64 {
    if denominator > 0.0 {
        numerator / denominator
    } else {
        UNDEFINED_RATIO
    }
}

/// Ligand ratios (cancer, stroma)
fn ligand_ratios(selection: &RoleSelection) -> (f64, f64) {
    let cancer = selection.expression(Role::Ligand, Side::Cancer);
    let total = selection.role_total(Role::Ligand);
    if total > 0.0 {
        let r = ratio(cancer, total);
        (r, 1.0 - r)
    } else {
        (UNDEFINED_RATIO, UNDEFINED_RATIO)
    }
}

/// Receptor ratios (cancer, stroma)
fn receptor_ratios(selection: &RoleSelection) -> (f64, f64) {
    let stromal = selection.expression(Role::Receptor, Side::Stromal);
    let total = selection.role_total(Role::Receptor);
    if total > 0.0 {
        let r = ratio(stromal, total);
        (1.0 - r, r)
    } else {
        (UNDEFINED_RATIO, UNDEFINED_RATIO)
    }
}

/// Score every interaction of the catalog, in catalog order
pub fn score_interactions(catalog: &Catalog, expression: &GeneExpression) -> Vec<InteractionScore> {
    let interactions = catalog.interactions();
    let selections: Vec<RoleSelection> = interactions
        .iter()
        .map(|interaction| RoleSelection::select(interaction, expression))
        .collect();

    let scores: Vec<InteractionScore> = interactions
        .iter()
        .enumerate()
        .map(|(idx, interaction)| {
            let selection = selections[idx];
            let lig_c = selection.expression(Role::Ligand, Side::Cancer);
            let lig_s = selection.expression(Role::Ligand, Side::Stromal);
            let rec_c = selection.expression(Role::Receptor, Side::Cancer);
            let rec_s = selection.expression(Role::Receptor, Side::Stromal);

            let any_direction =
                interaction.valid_cancer_to_stroma || interaction.valid_stroma_to_cancer;
            let (ligand_ratio_cancer, ligand_ratio_stroma) = if any_direction {
                let (c, s) = ligand_ratios(&selection);
                (Some(c), Some(s))
            } else {
                (None, None)
            };

            let same_receptor_total: f64 = interactions
                .iter()
                .zip(&selections)
                .filter(|(other, _)| other.receptor_symbol == interaction.receptor_symbol)
                .map(|(_, other)| other.role_total(Role::Ligand))
                .sum();
            let ligand_possession = (same_receptor_total > 0.0)
                .then(|| selection.role_total(Role::Ligand) / same_receptor_total);

            let (receptor_ratio_cancer, receptor_ratio_stroma) = receptor_ratios(&selection);

            InteractionScore {
                selection,
                average_cancer_to_stroma: interaction
                    .valid_cancer_to_stroma
                    .then(|| (lig_c * rec_s).sqrt()),
                average_stroma_to_cancer: interaction
                    .valid_stroma_to_cancer
                    .then(|| (lig_s * rec_c).sqrt()),
                ligand_ratio_cancer,
                ligand_ratio_stroma,
                ligand_possession,
                receptor_ratio_cancer,
                receptor_ratio_stroma,
                cancer_ligand: view::cross_aggregate(View::CancerLigand, idx, interactions, &selections),
                cancer_receptor: view::cross_aggregate(View::CancerReceptor, idx, interactions, &selections),
                stromal_ligand: view::cross_aggregate(View::StromalLigand, idx, interactions, &selections),
                stromal_receptor: view::cross_aggregate(View::StromalReceptor, idx, interactions, &selections),
            }
        })
        .collect();

    log::info!("Scored {} interactions", scores.len());
    scores
}
