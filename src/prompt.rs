// Prompt template sent to the chat-completion estimator

use crate::models::LifestyleInputs;

/// System message for every estimate request
pub const SYSTEM_INSTRUCTION: &str =
    "Provide a daily carbon footprint calculation and exactly one challenge.";

/// Render the user message for one submission.
///
/// Pure interpolation: the reply format is requested as JSON, with the
/// two-line layout as a fallback the parser still understands.
pub fn render_prompt(inputs: &LifestyleInputs) -> String {
    format!(
        r#"The user is tracking their carbon footprint daily. Calculate the total daily CO2 emissions in kg based on:
- Commute: {commute_mode} ({commute_distance} miles)
- Food: {food_type} with {takeout_packaging} packaging
- Pages Used: {pages_used}, Reusables: {reusable_items}
- Green Initiatives: {participation}
- Shopping: {shopping_habits}
- Travel: {flights} flights, {trains} train trips per month

Return ONLY valid JSON with these exact fields:
{{
  "carbon": <total daily CO2 in kg, number only>,
  "challenge": "<ONE challenge targeting the highest contributor>"
}}

If you cannot produce JSON, answer with two lines: the number on the first line and the challenge on the second."#,
        commute_mode = inputs.commute_mode,
        commute_distance = inputs.commute_distance,
        food_type = inputs.food_type,
        takeout_packaging = inputs.takeout_packaging,
        pages_used = inputs.pages_used,
        reusable_items = inputs.reusable_items,
        participation = inputs.participation,
        shopping_habits = inputs.shopping_habits,
        flights = inputs.flights_per_month,
        trains = inputs.train_trips_per_month,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompt_interpolates_every_answer() {
        let inputs = LifestyleInputs {
            commute_mode: "diesel_car".to_string(),
            commute_distance: 7.5,
            food_type: "meat_based".to_string(),
            takeout_packaging: "plastic".to_string(),
            pages_used: 12,
            reusable_items: 1,
            participation: "no".to_string(),
            shopping_habits: "non_eco_friendly".to_string(),
            flights_per_month: 2,
            train_trips_per_month: 3,
        };

        let prompt = render_prompt(&inputs);
        assert!(prompt.contains("Commute: diesel_car (7.5 miles)"));
        assert!(prompt.contains("Food: meat_based with plastic packaging"));
        assert!(prompt.contains("Pages Used: 12, Reusables: 1"));
        assert!(prompt.contains("Green Initiatives: no"));
        assert!(prompt.contains("Shopping: non_eco_friendly"));
        assert!(prompt.contains("Travel: 2 flights, 3 train trips per month"));
        assert!(prompt.contains("\"carbon\""));
    }
}
