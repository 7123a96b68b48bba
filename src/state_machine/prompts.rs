//! Outbound chat texts
//!
//! Each helper renders one prompt as the effect(s) that send it. Prompts that
//! the bot shows before a language is chosen are bilingual.

use super::effect::{Button, Card, Effect};
use super::event::Payload;
use super::state::{CartItem, Conversation, DeliveryType, DialogContext, Language};
use crate::catalog::{format_price, Catalog, Cents};
use crate::db::{Order, OrderItem};
use crate::pricing::{BusinessHours, Totals};
use std::fmt::Write;

pub const PRODUCT_OUT_OF_SEQUENCE: &str =
    "⚠️ Please complete your current step first, or type 'cancel' to start over.";
pub const QUANTITY_OUT_OF_SEQUENCE: &str = "⚠️ Please select a product first!";
pub const STEP_OUT_OF_SEQUENCE: &str =
    "⚠️ That option isn't available right now. Please use the buttons above, or type 'cancel' to start over.";
pub const UNKNOWN_PAYLOAD: &str = "Sorry, I didn't understand that. Let's start over!";
pub const INVALID_NAME: &str = "Please enter a valid name (at least 2 characters).";
pub const INVALID_ADDRESS: &str = "Please enter a complete delivery address.";
pub const ORDER_FAILED: &str =
    "😞 Sorry, there was an error placing your order. Please try again later.";

const DIVIDER: &str = "━━━━━━━━━━━━";

fn back() -> Button {
    Button::new("⬅️ Back", &Payload::GoBack)
}

fn cancel() -> Button {
    Button::new("❌ Cancel", &Payload::CancelOrder)
}

// ============================================================================
// Language & Menus
// ============================================================================

pub fn language_selection() -> Vec<Effect> {
    let welcome = "Hi there! 👋 မင်္ဂလာပါ! 👋\n\n\
        I'm BakeFlow Bot, your virtual bakery assistant. I'll do my best to help you order! 🍰\n\n\
        ကျွန်တော် BakeFlow Bot ပါ၊ သင့်ရဲ့ မုန့်ဆိုင် အကူအညီပေး စက်ရုပ်ပါ။ 🍰\n\n\
        Please select your language to get started.\n\
        စတင်ဖို့ ဘာသာစကားကို ရွေးချယ်ပါ။";
    vec![
        Effect::text(welcome),
        Effect::quick_replies(
            "Choose your language / ဘာသာစကား ရွေးပါ:",
            vec![
                Button::new("🇬🇧 English", &Payload::Language(Language::En)),
                Button::new("🇲🇲 မြန်မာ", &Payload::Language(Language::My)),
            ],
        ),
    ]
}

pub fn language_selected(lang: Language) -> Effect {
    Effect::text(lang.pick(
        "✅ English selected!",
        "✅ မြန်မာဘာသာ ရွေးချယ်ပြီးပါပြီ!",
    ))
}

/// Welcome line plus the main menu card
pub fn main_menu(lang: Language) -> Vec<Effect> {
    let card = match lang {
        Language::En => Card {
            title: "What would you like to do?".to_string(),
            subtitle: "Choose an option below".to_string(),
            image_url: None,
            buttons: vec![
                Button::new("🛒 Start Order", &Payload::MenuOrderProducts),
                Button::new("ℹ️ About", &Payload::MenuAbout),
                Button::new("❓ Help", &Payload::MenuHelp),
            ],
        },
        Language::My => Card {
            title: "ဘာလုပ်ချင်လဲ?".to_string(),
            subtitle: "အောက်ပါရွေးချယ်စရာများမှ ရွေးချယ်ပါ".to_string(),
            image_url: None,
            buttons: vec![
                Button::new("🛒 အော်ဒါစတင်မယ်", &Payload::MenuOrderProducts),
                Button::new("ℹ️ အကြောင်းအရာ", &Payload::MenuAbout),
                Button::new("❓ အကူအညီ", &Payload::MenuHelp),
            ],
        },
    };
    vec![
        Effect::text(lang.pick(
            "🍰 Welcome to BakeFlow!",
            "🍰 BakeFlow မှ ကြိုဆိုပါတယ်!",
        )),
        Effect::SendCarousel { cards: vec![card] },
    ]
}

pub fn main_menu_hint() -> Effect {
    Effect::text("Type 'menu' to see products or 'help' for assistance.")
}

pub fn product_carousel(catalog: &Catalog) -> Effect {
    let cards = catalog
        .products()
        .iter()
        .map(|p| Card {
            title: p.label(),
            subtitle: format!("{} • {}", p.description, format_price(p.price)),
            image_url: Some(p.image_url.clone()),
            buttons: vec![Button::new(
                "🛒 Order",
                &Payload::OrderProduct(p.code.clone()),
            )],
        })
        .collect();
    Effect::SendCarousel { cards }
}

pub fn menu_text(catalog: &Catalog) -> Effect {
    let mut menu = String::from("🍰 **BakeFlow Menu**\n\n");
    for p in catalog.products() {
        let _ = writeln!(menu, "{} {} - {}", p.emoji, p.name, format_price(p.price));
    }
    menu.push_str("\n👇 Click the buttons below to order!");
    Effect::text(menu)
}

pub fn closed_notice(lang: Language, ctx: &DialogContext) -> Effect {
    let hours = ctx.shop.hours;
    let next = hours.next_opening_display(&ctx.now);
    let text = match lang {
        Language::En => format!(
            "🔒 **We're Currently Closed**\n\n\
             Business Hours: {open}:00 - {close}:00\n\n\
             We'll be open again at {next}.\n\n\
             You can browse our menu, but ordering is temporarily unavailable.\n\n\
             See you soon! 🍰",
            open = hours.open_hour,
            close = hours.close_hour,
        ),
        Language::My => format!(
            "🔒 **ကျွန်ုပ်တို့ လောလောဆယ် ပိတ်နေပါတယ်**\n\n\
             ဖွင့်ချိန်: {open}:00 - {close}:00\n\n\
             ကျွန်ုပ်တို့ {next} မှာ ပြန်ဖွင့်ပါမယ်။\n\n\
             မီနူးကို ကြည့်နိုင်ပေမယ့် မှာယူခြင်းကို ယာယီ မရနိုင်ပါဘူး။\n\n\
             မကြာခင် တွေ့ရအောင်! 🍰",
            open = hours.open_hour,
            close = hours.close_hour,
        ),
    };
    Effect::text(text)
}

pub fn help() -> Effect {
    Effect::text(
        "🆘 *How to Order* / *မှာယူနည်း*\n\n\
         1️⃣ Choose what you'd like to order / လိုချင်တဲ့ပစ္စည်းကို ရွေးပါ\n\
         2️⃣ Select quantity / အရေအတွက် ရွေးပါ\n\
         3️⃣ Enter your name / နာမည် ထည့်ပါ\n\
         4️⃣ Choose pickup or delivery / ကိုယ်တိုင်ယူမလား ပို့မလား ရွေးပါ\n\
         5️⃣ Confirm your order / အတည်ပြုပါ\n\n\
         *You can type naturally:*\n\
         • \"I want chocolate cake\" / \"ချောကလက်ကိတ်လိုချင်တယ်\"\n\
         • \"Give me 2\" / \"2 ခု ပေးပါ\"\n\
         • \"I want to cancel\" / \"ပယ်ဖျက်ချင်တယ်\"\n\
         • \"Show menu\" / \"မီနူး ပြပါ\"\n\n\
         *Quick Commands:*\n\
         • 'menu' - View products\n\
         • 'orders' - Your order history\n\
         • 'cancel' - Start over",
    )
}

pub fn about(lang: Language, hours: &BusinessHours) -> Effect {
    let open = if hours.always_open {
        lang.pick("Open 24 hours", "၂၄ နာရီ ဖွင့်ပါတယ်").to_string()
    } else {
        hours.hours_display()
    };
    let text = match lang {
        Language::En => format!(
            "🏪 About Us\n\n\
             BakeFlow is your neighborhood bakery, baking fresh daily!\n\n\
             📍 Location: Yangon, Myanmar\n\
             ⏰ Hours: {open}\n\n\
             ❓ How to Use\n\n\
             You can type naturally:\n\
             • \"menu\" or \"show products\"\n\
             • \"I want chocolate cake\"\n\
             • \"two\" or \"2\"\n\
             • \"delivery please\" or \"pickup\"\n\
             • \"cancel\" or \"start over\"\n\n\
             🛒 Type 'menu' to start ordering!"
        ),
        Language::My => format!(
            "🏪 ကျွန်ုပ်တို့အကြောင်း\n\n\
             BakeFlow သည် နေ့စဉ် လတ်ဆတ်စွာ ဖုတ်လုပ်သော မုန့်ဆိုင်ဖြစ်ပါတယ်!\n\n\
             📍 တည်နေရာ: ရန်ကုန်မြို့\n\
             ⏰ ဖွင့်ချိန်: {open}\n\n\
             ❓ အသုံးပြုနည်း\n\n\
             သဘာဝဘာသာစကားဖြင့် ရိုက်နိုင်ပါတယ်:\n\
             • \"မီနူး\"\n\
             • \"ချောကလက်ကိတ်မုန့်လိုချင်တယ်\"\n\
             • \"နှစ်ခု\" သို့မဟုတ် \"2\"\n\
             • \"ပို့ပေးပါ\" သို့မဟုတ် \"ကိုယ်တိုင်ယူမယ်\"\n\
             • \"ပယ်ဖျက်\"\n\n\
             🛒 အော်ဒါမှာရန် 'မီနူး' လို့ရိုက်ပါ!"
        ),
    };
    Effect::text(text)
}

pub fn cancelled() -> Vec<Effect> {
    vec![
        Effect::text("❌ Order cancelled."),
        Effect::text("━━━━━━━━━━━━━━━━━"),
        Effect::text("Ready to start fresh? Type 'menu' to see our products!"),
    ]
}

// ============================================================================
// Cart & Checkout
// ============================================================================

pub fn ask_quantity(emoji: &str, product: &str) -> Effect {
    let mut choices: Vec<Button> = (1..=5)
        .map(|n| Button::new(n.to_string(), &Payload::Quantity(n)))
        .collect();
    choices.extend([back(), cancel()]);
    Effect::quick_replies(format!("How many {emoji} {product} would you like?"), choices)
}

/// Confirmation of the most recent cart line with the add-more/checkout choice
pub fn added_to_cart(conv: &Conversation) -> Effect {
    let count = conv.item_count();
    let text = match conv.cart.last() {
        Some(last) => format!(
            "✅ {}× {} {} added\n\nCart: {count} items",
            last.quantity, last.emoji, last.product
        ),
        None => format!("Cart: {count} items"),
    };
    Effect::quick_replies(text, cart_decision_choices(count))
}

pub fn cart_decision_choices(count: u32) -> Vec<Button> {
    vec![
        Button::new("Add More", &Payload::AddMore),
        Button::new(format!("Checkout ({count})"), &Payload::Checkout),
        cancel(),
    ]
}

pub fn cart_contents(cart: &[CartItem]) -> Effect {
    let mut text = String::from("🛒 **Your Cart:**\n\n");
    let mut total = 0;
    for item in cart {
        let _ = writeln!(text, "• {}× {} {}", item.quantity, item.emoji, item.product);
        total += item.quantity;
    }
    let _ = write!(text, "\n**Total Items:** {total}");
    Effect::text(text)
}

pub fn ask_name() -> Effect {
    Effect::quick_replies(
        "Great! What's your name?",
        vec![Button::new("⬅️ Back to Cart", &Payload::GoBack), cancel()],
    )
}

pub fn ask_delivery_type(name: &str) -> Effect {
    Effect::quick_replies(
        format!("Thanks {name}! Would you like pickup or delivery?"),
        vec![
            Button::new("🏠 Pickup", &Payload::Pickup),
            Button::new("🚚 Delivery", &Payload::Delivery),
            back(),
            cancel(),
        ],
    )
}

pub fn ask_address() -> Effect {
    Effect::quick_replies(
        "Perfect! Please type your delivery address:\n(Street, City, ZIP)",
        vec![back(), cancel()],
    )
}

/// "• 2× 🍫 Chocolate Cake - $50.00"
pub fn item_line(quantity: u32, emoji: &str, product: &str, line_total: Cents) -> String {
    format!(
        "• {quantity}× {emoji} {product} - {}\n",
        format_price(line_total)
    )
}

pub fn pricing_block(totals: &Totals) -> String {
    format!(
        "\n💰 **Pricing:**\nSubtotal: {}\nDelivery Fee: {}\n{DIVIDER}\n**Total: {}**",
        format_price(totals.subtotal),
        format_price(totals.delivery_fee),
        format_price(totals.total),
    )
}

pub fn order_summary(conv: &Conversation, ctx: &DialogContext, totals: &Totals) -> Effect {
    let catalog = &ctx.shop.catalog;
    let mut items = String::new();
    for item in &conv.cart {
        let unit = catalog.get(&item.product).map_or(0, |p| p.price);
        items.push_str(&item_line(
            item.quantity,
            &item.emoji,
            &item.product,
            unit * Cents::from(item.quantity),
        ));
    }
    let delivery = conv.delivery_type.map_or("", DeliveryType::label);
    let text = format!(
        "📋 **Order Summary**\n\n🛒 **Your Items:**\n{items}{}\n\n\
         👤 **Customer:** {}\n{delivery}\n📍 **Address:** {}\n\n\
         Everything look good?",
        pricing_block(totals),
        conv.customer_name.as_deref().unwrap_or_default(),
        conv.address.as_deref().unwrap_or_default(),
    );
    Effect::quick_replies(
        text,
        vec![
            Button::new("✅ Confirm Order", &Payload::ConfirmOrder),
            back(),
            cancel(),
        ],
    )
}

// ============================================================================
// History, Reorder & Rating
// ============================================================================

const HISTORY_LIMIT: usize = 5;
const HISTORY_ITEMS_SHOWN: usize = 3;

pub fn order_history(orders: &[Order], lang: Language, catalog: &Catalog) -> Vec<Effect> {
    if orders.is_empty() {
        return vec![Effect::text(lang.pick(
            "🛒 **No Orders Yet!**\n\n\
             You haven't placed any orders with us.\n\n\
             Ready to try our delicious baked goods?\n\n\
             Type 'menu' to start ordering! 🍰",
            "🛒 **မှာထားမှုမရှိသေးပါ!**\n\n\
             သင် ကျွန်ုပ်တို့နှင့် မှာထားမှုမလုပ်ရသေးပါ။\n\n\
             'မီနူး' လို့ရိုက်ပြီး မှာယူလိုက်ပါ! 🍰",
        ))];
    }

    let shown = &orders[..orders.len().min(HISTORY_LIMIT)];
    let cards = shown.iter().map(|o| history_card(o, catalog)).collect();
    vec![
        Effect::text(format!(
            "📋 **Your Recent Orders** (Showing {} of {})",
            shown.len(),
            orders.len()
        )),
        Effect::SendCarousel { cards },
    ]
}

fn history_card(order: &Order, catalog: &Catalog) -> Card {
    let mut items = String::new();
    for item in order.items.iter().take(HISTORY_ITEMS_SHOWN) {
        let _ = writeln!(
            items,
            "{}× {} {}",
            item.quantity,
            catalog.emoji_for(&item.product),
            item.product
        );
    }
    if order.items.len() > HISTORY_ITEMS_SHOWN {
        let _ = writeln!(
            items,
            "...and {} more items",
            order.items.len() - HISTORY_ITEMS_SHOWN
        );
    }

    Card {
        title: format!("Order #{} - {}", order.id, order.customer_name),
        subtitle: format!(
            "{} • {}\n{}\nTotal: {}\n\n{items}",
            order.status.badge(),
            order.delivery_type.label(),
            order.created_at.format("%b %-d, %-I:%M %p"),
            format_price(order.total),
        ),
        image_url: None,
        buttons: vec![
            Button::new("🔄 Reorder", &Payload::Reorder(order.id)),
            Button::new("⭐ Rate", &Payload::RateOrder(order.id)),
        ],
    }
}

pub fn history_failed() -> Effect {
    Effect::text("😞 Sorry, couldn't load your order history. Please try again later.")
}

pub fn reorder_failed() -> Effect {
    Effect::text("😞 Sorry, couldn't load that order. Please try again.")
}

pub fn reorder_intro(order_id: i64, items: u32) -> Effect {
    Effect::text(format!(
        "🔄 **Reordering from Order #{order_id}**\n\n✅ Added {items} items to your cart!"
    ))
}

pub fn ask_rating(lang: Language) -> Effect {
    Effect::quick_replies(
        lang.pick(
            "⭐ **How was your order?**\n\n\
             We'd love to hear your feedback!\n\
             Please rate your experience:",
            "⭐ **အော်ဒါက ဘယ်လိုလဲ?**\n\n\
             သင့်ရဲ့ အကြံပြုချက်ကို ကြားလိုပါတယ်!\n\
             သင့်အတွေ့အကြုံကို အဆင့်သတ်မှတ်ပေးပါ:",
        ),
        vec![
            Button::new("⭐ 1 Star - Poor", &Payload::Rating(1)),
            Button::new("⭐⭐ 2 Stars", &Payload::Rating(2)),
            Button::new("⭐⭐⭐ 3 Stars", &Payload::Rating(3)),
            Button::new("⭐⭐⭐⭐ 4 Stars", &Payload::Rating(4)),
            Button::new("⭐⭐⭐⭐⭐ 5 Stars - Excellent!", &Payload::Rating(5)),
            Button::new("Skip", &Payload::SkipRating),
        ],
    )
}

pub fn rating_thanks(stars: u8, lang: Language) -> Effect {
    let text = match stars {
        4.. => lang.pick(
            "🎉 **Thank you so much!**\n\n\
             We're thrilled you loved your order! ⭐⭐⭐⭐⭐\n\n\
             Looking forward to serving you again! 🍰",
            "🎉 **အရမ်းကျေးဇူးတင်ပါတယ်!**\n\n\
             သင့် အော်ဒါကို နှစ်သက်တာ သိရတာ အရမ်းဝမ်းသာပါတယ်! ⭐⭐⭐⭐⭐\n\n\
             နောက်တစ်ခါ ထပ်ဆောင်ရွက်ပေးဖို့ မျှော်လင့်နေပါတယ်! 🍰",
        ),
        3 => lang.pick(
            "😊 **Thank you for your feedback!**\n\n\
             We appreciate your honesty. We're always working to improve!\n\n\
             Type 'menu' to order again! 🍰",
            "😊 **သင့်အကြံပြုချက်အတွက် ကျေးဇူးတင်ပါတယ်!**\n\n\
             ကျွန်ုပ်တို့ အမြဲတမ်း တိုးတက်အောင် လုပ်ဆောင်နေပါတယ်!\n\n\
             'မီနူး' လို့ရိုက်ပြီး ထပ်မှာလိုက်ပါ! 🍰",
        ),
        _ => lang.pick(
            "😔 **We're sorry you weren't satisfied.**\n\n\
             Your feedback is important to us. We'll do better next time!\n\n\
             Please give us another chance. Type 'menu' to order! 🍰",
            "😔 **သင် မကျေနပ်မှုအတွက် တောင်းပန်ပါတယ်။**\n\n\
             နောက်တစ်ခါ ပိုကောင်းအောင် လုပ်ပါမယ်!\n\n\
             'မီနူး' လို့ရိုက်ပြီး မှာလိုက်ပါ! 🍰",
        ),
    };
    Effect::text(text)
}

pub fn rating_failed(lang: Language) -> Effect {
    Effect::text(lang.pick(
        "😞 Sorry, couldn't save your rating. Please try again later.",
        "😞 အဆင့်သတ်မှတ်ချက်ကို သိမ်းမရပါ။ နောက်မှ ထပ်ကြိုးစားပါ။",
    ))
}

pub fn rating_skipped() -> Effect {
    Effect::text("No problem! Feel free to rate us anytime.\n\nType 'menu' to order again! 🍰")
}

/// Items list shared by receipts: emoji comes from the current catalog
pub fn order_items_block(items: &[OrderItem], catalog: &Catalog) -> String {
    items
        .iter()
        .map(|item| {
            item_line(
                item.quantity,
                catalog.emoji_for(&item.product),
                &item.product,
                item.line_total(),
            )
        })
        .collect()
}
