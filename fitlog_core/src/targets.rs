//! Daily energy and macro targets.
//!
//! Basal metabolic rate follows Mifflin-St Jeor, scaled by a fixed
//! activity multiplier and shifted by the goal:
//!
//! - lose weight: TDEE - 500 kcal
//! - gain weight: TDEE + 300 kcal
//! - maintain: TDEE
//!
//! Macros split the calorie target 30/40/30 (protein/carbs/fat) at
//! 4/4/9 kcal per gram. Each macro is rounded on its own, so the grams
//! do not always add back up to the calorie target exactly.

use crate::{ActivityLevel, Error, Goal, ProfileInput, Result, Sex, Targets, UserProfile};

const KCAL_PER_GRAM_PROTEIN: f64 = 4.0;
const KCAL_PER_GRAM_CARBS: f64 = 4.0;
const KCAL_PER_GRAM_FAT: f64 = 9.0;

const PROTEIN_SHARE: f64 = 0.30;
const CARBS_SHARE: f64 = 0.40;
const FAT_SHARE: f64 = 0.30;

const DEFICIT_KCAL: f64 = 500.0;
const SURPLUS_KCAL: f64 = 300.0;

const MAX_AGE: u32 = 150;

impl ActivityLevel {
    /// TDEE multiplier applied to BMR
    pub fn multiplier(&self) -> f64 {
        match self {
            ActivityLevel::Sedentary => 1.2,
            ActivityLevel::Light => 1.375,
            ActivityLevel::Moderate => 1.55,
            ActivityLevel::Active => 1.725,
            ActivityLevel::VeryActive => 1.9,
        }
    }
}

/// Basal metabolic rate in kcal/day
pub fn bmr(input: &ProfileInput) -> f64 {
    let base = 10.0 * input.weight_kg + 6.25 * input.height_cm - 5.0 * f64::from(input.age);
    match input.sex {
        Sex::Male => base + 5.0,
        Sex::Female | Sex::Other => base - 161.0,
    }
}

/// Total daily energy expenditure in kcal/day
pub fn tdee(input: &ProfileInput) -> f64 {
    bmr(input) * input.activity_level.multiplier()
}

/// Split a calorie target into macro grams
pub fn macro_split(calories: i64) -> Targets {
    let cal = calories as f64;
    Targets {
        calories,
        protein: (cal * PROTEIN_SHARE / KCAL_PER_GRAM_PROTEIN).round() as i64,
        carbs: (cal * CARBS_SHARE / KCAL_PER_GRAM_CARBS).round() as i64,
        fats: (cal * FAT_SHARE / KCAL_PER_GRAM_FAT).round() as i64,
    }
}

/// Validate the profile fields and compute targets
pub fn calculate_targets(input: &ProfileInput) -> Result<Targets> {
    validate(input)?;

    let tdee = tdee(input);
    let calories = match input.goal {
        Goal::LoseWeight => (tdee - DEFICIT_KCAL).round(),
        Goal::GainWeight => (tdee + SURPLUS_KCAL).round(),
        Goal::Maintain => tdee.round(),
    } as i64;

    if calories <= 0 {
        return Err(Error::InvalidProfile(format!(
            "computed calorie target {} is not positive",
            calories
        )));
    }

    let targets = macro_split(calories);
    tracing::debug!(
        "Targets for {:?}/{:?}: {} kcal, P{} C{} F{}",
        input.activity_level,
        input.goal,
        targets.calories,
        targets.protein,
        targets.carbs,
        targets.fats
    );
    Ok(targets)
}

fn validate(input: &ProfileInput) -> Result<()> {
    if input.age == 0 || input.age > MAX_AGE {
        return Err(Error::InvalidProfile(format!(
            "age must be between 1 and {}, got {}",
            MAX_AGE, input.age
        )));
    }
    if !input.weight_kg.is_finite() || input.weight_kg <= 0.0 {
        return Err(Error::InvalidProfile(format!(
            "weight must be positive, got {}",
            input.weight_kg
        )));
    }
    if !input.height_cm.is_finite() || input.height_cm <= 0.0 {
        return Err(Error::InvalidProfile(format!(
            "height must be positive, got {}",
            input.height_cm
        )));
    }
    Ok(())
}

impl UserProfile {
    /// Build a profile, computing its targets
    pub fn new(input: ProfileInput) -> Result<Self> {
        let targets = calculate_targets(&input)?;
        Ok(Self { input, targets })
    }
}

impl TryFrom<ProfileInput> for UserProfile {
    type Error = Error;

    fn try_from(input: ProfileInput) -> Result<Self> {
        UserProfile::new(input)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reference_input(goal: Goal) -> ProfileInput {
        ProfileInput {
            name: "Alex".into(),
            age: 30,
            weight_kg: 70.0,
            height_cm: 175.0,
            sex: Sex::Male,
            activity_level: ActivityLevel::Moderate,
            goal,
        }
    }

    #[test]
    fn test_reference_maintain() {
        let input = reference_input(Goal::Maintain);
        assert_eq!(bmr(&input), 1648.75);
        assert!((tdee(&input) - 2555.5625).abs() < 1e-9);

        let targets = calculate_targets(&input).unwrap();
        assert_eq!(targets.calories, 2556);
        assert_eq!(targets.protein, 192);
        assert_eq!(targets.carbs, 256);
        assert_eq!(targets.fats, 85);
    }

    #[test]
    fn test_reference_lose_and_gain() {
        let lose = calculate_targets(&reference_input(Goal::LoseWeight)).unwrap();
        assert_eq!(lose.calories, 2056);

        let gain = calculate_targets(&reference_input(Goal::GainWeight)).unwrap();
        assert_eq!(gain.calories, 2856);
    }

    #[test]
    fn test_maintain_matches_formula_for_every_level() {
        let levels = [
            ActivityLevel::Sedentary,
            ActivityLevel::Light,
            ActivityLevel::Moderate,
            ActivityLevel::Active,
            ActivityLevel::VeryActive,
        ];
        for sex in [Sex::Male, Sex::Female, Sex::Other] {
            for level in levels {
                let input = ProfileInput {
                    sex,
                    activity_level: level,
                    ..reference_input(Goal::Maintain)
                };
                let expected = (bmr(&input) * level.multiplier()).round() as i64;
                assert_eq!(calculate_targets(&input).unwrap().calories, expected);
            }
        }
    }

    #[test]
    fn test_other_uses_female_offset() {
        let female = ProfileInput {
            sex: Sex::Female,
            ..reference_input(Goal::Maintain)
        };
        let other = ProfileInput {
            sex: Sex::Other,
            ..reference_input(Goal::Maintain)
        };
        assert_eq!(bmr(&female), 1648.75 - 166.0);
        assert_eq!(bmr(&female), bmr(&other));
    }

    #[test]
    fn test_rejects_non_positive_fields() {
        let zero_age = ProfileInput {
            age: 0,
            ..reference_input(Goal::Maintain)
        };
        assert!(matches!(calculate_targets(&zero_age), Err(Error::InvalidProfile(_))));

        let negative_weight = ProfileInput {
            weight_kg: -70.0,
            ..reference_input(Goal::Maintain)
        };
        assert!(matches!(
            calculate_targets(&negative_weight),
            Err(Error::InvalidProfile(_))
        ));

        let nan_height = ProfileInput {
            height_cm: f64::NAN,
            ..reference_input(Goal::Maintain)
        };
        assert!(matches!(calculate_targets(&nan_height), Err(Error::InvalidProfile(_))));
    }

    #[test]
    fn test_rejects_non_positive_target() {
        let tiny = ProfileInput {
            weight_kg: 1.0,
            height_cm: 10.0,
            age: 120,
            sex: Sex::Female,
            goal: Goal::LoseWeight,
            ..reference_input(Goal::Maintain)
        };
        assert!(matches!(calculate_targets(&tiny), Err(Error::InvalidProfile(_))));
    }

    #[test]
    fn test_stored_targets_are_recomputed() {
        let json = r#"{
            "name": "Alex",
            "age": 30,
            "weight_kg": 70.0,
            "height_cm": 175.0,
            "sex": "male",
            "activity_level": "moderate",
            "goal": "maintain",
            "targets": { "calories": 9999, "protein": 1, "carbs": 1, "fats": 1 }
        }"#;
        let profile: UserProfile = serde_json::from_str(json).unwrap();
        assert_eq!(profile.targets().calories, 2556);
        assert_eq!(profile.targets().protein, 192);
    }

    #[test]
    fn test_profile_serializes_targets() {
        let profile = UserProfile::new(reference_input(Goal::Maintain)).unwrap();
        let value = serde_json::to_value(&profile).unwrap();
        assert_eq!(value["targets"]["calories"], 2556);
        assert_eq!(value["activity_level"], "moderate");
    }
}
