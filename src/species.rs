use crate::domain::Species;

// Species with CDS releases worth fetching for the LRT panel. Names follow
// the condensed Genus+species convention used in portal filenames, which is
// also what species_from_filename() derives.
pub const DEFAULT_SPECIES: &[&str] = &[
    "Athaliana",
    "Alyrata",
    "Bdistachyon",
    "Brapa",
    "Creinhardtii",
    "Crubella",
    "Fvesca",
    "Gmax",
    "Graimondii",
    "Mtruncatula",
    "Osativa",
    "Ppatens",
    "Ppersica",
    "Ptrichocarpa",
    "Pvulgaris",
    "Sbicolor",
    "Sitalica",
    "Slycopersicum",
    "Stuberosum",
    "Vvinifera",
    "Zmays",
];

pub fn default_allow_list() -> Vec<Species> {
    DEFAULT_SPECIES
        .iter()
        .map(|name| name.parse().expect("built-in species names are valid"))
        .collect()
}
