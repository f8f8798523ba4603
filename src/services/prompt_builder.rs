//! Prompt construction for both generation phases.
//!
//! Everything here is a pure function of the [`TripInput`]: the same input
//! always yields byte-identical prompts, and an absent optional field simply
//! produces no line.

use crate::models::trip_input::{DateSpec, LocationPreference, TripInput};

const STANDARD_SYSTEM_PROMPT: &str = "You are an experienced travel planner. \
Recommend real destinations that fit the traveler's criteria, rank them honestly by fit, \
and give practical, specific advice. All costs must be estimated in EUR per person. \
Respond only with JSON matching the requested schema.";

const ROAD_TRIP_SYSTEM_PROMPT: &str = "You are an experienced road-trip planner. \
Design multi-stop driving routes rather than single destinations: each suggestion is a route \
with ordered stops, realistic driving times between them and places to stay overnight. \
All costs must be estimated in EUR per person. \
Respond only with JSON matching the requested schema.";

/// Hours of driving after which a leg must be broken up by an overnight stop.
pub const OVERNIGHT_BREAK_HOURS: u32 = 4;

pub fn system_prompt(input: &TripInput) -> &'static str {
    if input.is_road_trip() {
        ROAD_TRIP_SYSTEM_PROMPT
    } else {
        STANDARD_SYSTEM_PROMPT
    }
}

/// Criteria lines shared by both phases, in a fixed order.
pub fn criteria_lines(input: &TripInput) -> Vec<String> {
    let mut lines: Vec<Option<String>> = Vec::new();

    lines.push(input.home_city.as_ref().map(|c| format!("Home city: {}", c)));
    lines.push(
        input
            .travel_range
            .map(|r| format!("Travel range: {}", r.describe())),
    );

    match &input.dates {
        DateSpec::Exact {
            start_date,
            end_date,
        } => {
            lines.push(Some(format!("Travel dates: {} to {}", start_date, end_date)));
        }
        DateSpec::Flexible {
            description,
            duration_days,
        } => {
            lines.push(Some(match description {
                Some(d) => format!("Travel dates: flexible ({})", d),
                None => "Travel dates: flexible".to_string(),
            }));
            lines.push(duration_days.map(|r| {
                if r.min == r.max {
                    format!("Trip duration: {} days", r.min)
                } else {
                    format!("Trip duration: {}-{} days", r.min, r.max)
                }
            }));
        }
    }

    lines.push(Some(format!("Travelers: {}", input.travelers)));
    if !input.interests.is_empty() {
        lines.push(Some(format!("Interests: {}", input.interests.join(", "))));
    }
    lines.push(
        input
            .weather_preference
            .as_ref()
            .map(|w| format!("Weather preference: {}", w)),
    );
    lines.push(Some(format!("Budget level: {}", input.budget_level.as_str())));
    lines.push(Some(format!("Trip style: {}", input.trip_style.as_str())));

    lines.push(Some(match &input.location_preference {
        LocationPreference::Open => "Open to anywhere in the world".to_string(),
        LocationPreference::Region { region } => format!("Region preference: {}", region),
        LocationPreference::Compare { places } => {
            format!("Compare these places: {}", places.join(", "))
        }
    }));

    lines.push(
        input
            .starting_point
            .as_ref()
            .map(|s| format!("Starting point: {}", s)),
    );
    lines.push(input.notes.as_ref().map(|n| format!("Additional notes: {}", n)));

    lines.into_iter().flatten().collect()
}

/// Phase 1 prompt: ask for 4-10 ranked candidates.
pub fn exploration_prompt(input: &TripInput) -> String {
    let mut prompt = String::new();

    if input.is_road_trip() {
        prompt.push_str("Suggest between 4 and 10 road-trip routes for this traveler.\n");
    } else {
        prompt.push_str("Suggest between 4 and 10 destinations for this traveler.\n");
    }
    prompt.push_str("\nTraveler criteria:\n");
    for line in criteria_lines(input) {
        prompt.push_str("- ");
        prompt.push_str(&line);
        prompt.push('\n');
    }

    prompt.push_str("\nFor each suggestion give: name, country, coordinates, a short reasoning, ");
    prompt.push_str("a match score from 0 to 100, an estimated daily cost per person in EUR, ");
    prompt.push_str("the best time to visit, up to 4 top activities, a weather snapshot ");
    prompt.push_str("(average temperature, sunshine hours per day, rainy days per month) ");
    prompt.push_str("and a suggested duration.\n");

    if input.is_road_trip() {
        prompt.push_str("Also give the ordered route stops with coordinates, the driving pace ");
        prompt.push_str("(relaxed, moderate or intensive), the total driving hours and the travel ");
        prompt.push_str("mode (drive_only or fly_and_drive).\n");
    }

    prompt.push_str("Order suggestions by match score, best first. Include a weather comparison ");
    prompt.push_str("across the suggestions, a one-paragraph summary, and name the single ");
    prompt.push_str("destination you recommend most.");

    prompt
}

/// Phase 2 prompt: a full plan for one chosen destination.
pub fn detail_prompt(name: &str, country: &str, input: &TripInput) -> String {
    let mut prompt = String::new();

    if input.is_road_trip() {
        prompt.push_str(&format!(
            "Create a detailed road-trip plan for the route \"{}\" ({}).\n",
            name, country
        ));
    } else {
        prompt.push_str(&format!(
            "Create a detailed travel plan for {}, {}.\n",
            name, country
        ));
    }
    prompt.push_str("\nTraveler criteria:\n");
    for line in criteria_lines(input) {
        prompt.push_str("- ");
        prompt.push_str(&line);
        prompt.push('\n');
    }

    prompt.push_str("\nInclude 3-4 pros and 3-4 cons, a day-by-day itinerary (for each day: ");
    prompt.push_str("day number, location, coordinates, highlights, where to stay overnight, ");
    prompt.push_str("meal suggestions and a one-sentence tip), estimated accommodation, flight ");
    prompt.push_str("and total trip costs per person in EUR, 5-8 local insights (category and ");
    prompt.push_str("text) and 2-4 local events happening around the travel dates.\n");

    if input.is_road_trip() {
        prompt.push_str(&road_trip_instructions(input));
    }

    prompt
}

fn road_trip_instructions(input: &TripInput) -> String {
    let mut out = String::from("\nRoute requirements:\n");
    out.push_str("- Progress through the stops in order; each itinerary day names where it starts ");
    out.push_str("and the drive time and distance from the previous day's location.\n");
    out.push_str("- Keep daily driving to a maximum of 6 hours; rest days have no drive time.\n");
    out.push_str(&format!(
        "- Any leg longer than {} hours must be split with an overnight stop along the way.\n",
        OVERNIGHT_BREAK_HOURS
    ));
    out.push_str("- Include an estimated driving cost (fuel and tolls) in EUR.\n");

    match (&input.starting_point, &input.home_city) {
        (Some(start), _) => out.push_str(&format!(
            "- The drive starts at {}. If that is too far to drive, use fly_and_drive: \
fly to the airport nearest the first stop and pick up a rental car there.\n",
            start
        )),
        (None, Some(home)) => out.push_str(&format!(
            "- The traveler lives in {}. Use drive_only when the route is reachable by car from there; \
otherwise use fly_and_drive from the airport nearest the first stop and include a flight cost.\n",
            home
        )),
        (None, None) => out.push_str(
            "- For fly_and_drive routes start at a major airport close to the first stop \
and include a flight cost.\n",
        ),
    }

    out
}
