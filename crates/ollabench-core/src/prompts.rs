/// Built-in benchmark corpus. Mixes short factual questions, explanations and
/// open-ended writing tasks so generated lengths vary across a run.
pub const DEFAULT_PROMPTS: &[&str] = &[
    "Explain quantum computing in simple terms",
    "Write a Python function to calculate Fibonacci sequence",
    "write a short story",
    "write a poem",
    "Describe three benefits of renewable energy",
    "What is the capital of France? Just state the city name.",
    "How does photosynthesis work in plants?",
    "Create a short poem about the changing seasons",
    "Describe the process of cellular respiration",
    "What are the main differences between Python and JavaScript?",
    "Explain the concept of object-oriented programming",
    "How does a neural network learn from data?",
    "Describe the water cycle in nature",
    "What causes earthquakes and how are they measured?",
    "Explain the theory of relativity in simple terms",
    "How do vaccines work to protect against diseases?",
    "Describe the structure of DNA and its role in genetics",
    "What is blockchain technology and how does it work?",
    "Explain the difference between HTTP and HTTPS",
    "How do clouds form in the atmosphere?",
    "Describe the process of evolution by natural selection",
    "What are black holes and how are they formed?",
    "Explain how a CPU processes instructions",
    "Describe the lifecycle of a butterfly",
    "What is machine learning and give an example of its application",
    "Explain the greenhouse effect and its impact on climate",
    "How do batteries store and release electrical energy?",
    "Describe the human digestive system",
    "What are the main layers of the Earth's atmosphere?",
    "Explain how solar panels convert sunlight into electricity",
    "Describe the process of mitosis in cell division",
    "What is the difference between RAM and ROM?",
    "Explain how GPS technology determines location",
    "Describe the structure and function of the human heart",
    "What causes the tides in Earth's oceans?",
    "Explain the concept of supply and demand in economics",
    "How do airplanes generate lift to fly?",
    "Describe the process of protein synthesis in cells",
    "What is artificial intelligence and what are its main branches?",
    "Explain how the immune system fights infections",
    "Describe the water treatment process for making it drinkable",
    "What are the main components of a computer network?",
    "Explain the difference between kinetic and potential energy",
    "How do electric motors convert electricity into motion?",
    "Describe the process of fossil fuel formation",
    "What is the carbon cycle and why is it important?",
    "Explain how microwave ovens heat food",
    "Describe the structure of the solar system",
    "What causes the phases of the moon?",
    "Explain how antibiotics fight bacterial infections",
    "Describe the process of DNA replication",
    "What is cryptography and how is it used in cybersecurity?",
    "Explain how nuclear power plants generate electricity",
    "Describe the human respiratory system",
    "What are enzymes and what role do they play in metabolism?",
    "Explain the concept of natural selection with an example",
    "How do optical fibers transmit data?",
    "Describe the process of soil formation",
    "What are the main types of renewable energy sources?",
    "Explain how the Doppler effect changes sound frequency",
    "Describe the structure and function of the human brain",
    "What causes volcanic eruptions?",
    "Explain how digital cameras capture images",
    "Describe the nitrogen cycle in ecosystems",
    "What is the difference between weather and climate?",
    "Explain how hybrid cars save fuel",
    "Describe the process of osmosis in cells",
    "What are stem cells and why are they important?",
    "Explain how radar systems detect objects",
    "Describe the process of fermentation in food production",
    "What is the big bang theory in cosmology?",
    "Explain how touchscreens detect input",
    "Describe the human circulatory system",
    "What causes lightning and thunder during storms?",
    "Explain the concept of opportunity cost in economics",
    "How do wind turbines generate electricity?",
    "Describe the process of metamorphosis in frogs",
    "What is the difference between analog and digital signals?",
    "Explain how vaccines create immunity",
    "Describe the structure of an atom",
    "What are the main types of rocks and how do they form?",
    "Explain how refrigerators keep food cold",
    "Describe the process of pollination in plants",
    "What causes the aurora borealis (northern lights)?",
    "Explain how voice recognition software works",
    "Describe the human skeletal system",
    "What is the difference between mass and weight?",
    "How do submarines dive and surface?",
    "Describe the process of eutrophication in water bodies",
    "What is machine translation and how does it work?",
    "Explain how solar eclipses occur",
    "Describe the process of cellular differentiation",
    "What causes ocean currents?",
    "Explain how biometric authentication systems work",
    "Describe the structure and function of the liver",
    "What is dark matter in astronomy?",
    "How do speakers convert electrical signals into sound?",
    "Describe the process of erosion and deposition",
    "What is the difference between AC and DC electricity?",
    "Explain how 3D printing creates objects",
    "Describe the human nervous system",
    "What causes seasons on Earth?",
];
